//! Compatibility layer for Solana message formats
//!
//! Legacy and v0 messages expose headers and account keys through different
//! types. These helpers give one API for both and resolve v0 lookup-table
//! indexes back into addresses, which is how compiled trade messages are
//! inspected after compression.

use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    message::{MessageHeader, VersionedMessage},
    pubkey::Pubkey,
};

use crate::tx_builder::ComposeError;

/// Get the message header from a `VersionedMessage`.
#[inline]
#[must_use]
pub fn get_message_header(message: &VersionedMessage) -> &MessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Account keys embedded in the message, excluding lookup-table loads
#[inline]
#[must_use]
pub fn get_static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

/// Accounts that must sign: the first `num_required_signatures` static keys
#[inline]
#[must_use]
pub fn get_required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let header = get_message_header(message);
    let account_keys = get_static_account_keys(message);
    let num_signers = header.num_required_signatures as usize;

    &account_keys[..num_signers.min(account_keys.len())]
}

/// Lookup tables a message references, in message order
pub fn lookup_table_keys(message: &VersionedMessage) -> Vec<Pubkey> {
    match message {
        VersionedMessage::Legacy(_) => Vec::new(),
        VersionedMessage::V0(v0_msg) => v0_msg
            .address_table_lookups
            .iter()
            .map(|lookup| lookup.account_key)
            .collect(),
    }
}

/// Full account key list as the runtime sees it
///
/// Static keys, then every writable load across tables, then every readonly
/// load.
pub fn loaded_account_keys(
    message: &VersionedMessage,
    tables: &[AddressLookupTableAccount],
) -> Result<Vec<Pubkey>, ComposeError> {
    let mut keys = get_static_account_keys(message).to_vec();
    let VersionedMessage::V0(v0_msg) = message else {
        return Ok(keys);
    };

    let mut writable = Vec::new();
    let mut readonly = Vec::new();
    for lookup in &v0_msg.address_table_lookups {
        let table = tables
            .iter()
            .find(|t| t.key == lookup.account_key)
            .ok_or_else(|| ComposeError::lookup_table(lookup.account_key, "table not supplied"))?;
        let load = |index: &u8| {
            table.addresses.get(*index as usize).copied().ok_or_else(|| {
                ComposeError::lookup_table(table.key, format!("index {} out of range", index))
            })
        };
        for index in &lookup.writable_indexes {
            writable.push(load(index)?);
        }
        for index in &lookup.readonly_indexes {
            readonly.push(load(index)?);
        }
    }
    keys.extend(writable);
    keys.extend(readonly);
    Ok(keys)
}

/// Program id and account list of every instruction, with lookups resolved
pub fn resolve_instructions(
    message: &VersionedMessage,
    tables: &[AddressLookupTableAccount],
) -> Result<Vec<(Pubkey, Vec<Pubkey>)>, ComposeError> {
    let keys = loaded_account_keys(message, tables)?;
    let key_at = |index: u8| {
        keys.get(index as usize)
            .copied()
            .ok_or_else(|| ComposeError::MessageCompile(format!("account index {} out of range", index)))
    };

    message
        .instructions()
        .iter()
        .map(|ix| {
            let program = key_at(ix.program_id_index)?;
            let accounts = ix
                .accounts
                .iter()
                .map(|index| key_at(*index))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((program, accounts))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        message::{v0::Message as MessageV0, Message},
    };

    fn instruction(program: Pubkey, payer: Pubkey, others: &[Pubkey]) -> Instruction {
        let mut metas = vec![AccountMeta::new(payer, true)];
        metas.extend(others.iter().map(|k| AccountMeta::new(*k, false)));
        Instruction::new_with_bytes(program, &[0], metas)
    }

    #[test]
    fn test_legacy_helpers() {
        let payer = Pubkey::new_unique();
        let ix = instruction(Pubkey::new_unique(), payer, &[Pubkey::new_unique()]);
        let message = VersionedMessage::Legacy(Message::new(&[ix], Some(&payer)));

        assert_eq!(get_message_header(&message).num_required_signatures, 1);
        assert_eq!(get_required_signers(&message), &[payer]);
        assert!(lookup_table_keys(&message).is_empty());
    }

    #[test]
    fn test_v0_resolution_through_table() {
        let payer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let loaded = [Pubkey::new_unique(), Pubkey::new_unique()];
        let table = AddressLookupTableAccount {
            key: Pubkey::new_unique(),
            addresses: loaded.to_vec(),
        };
        let ix = instruction(program, payer, &loaded);
        let message = VersionedMessage::V0(
            MessageV0::try_compile(&payer, &[ix], &[table.clone()], Hash::new_unique()).unwrap(),
        );

        assert_eq!(lookup_table_keys(&message), vec![table.key]);
        // table entries are not static keys
        assert!(!get_static_account_keys(&message).contains(&loaded[0]));

        let resolved = resolve_instructions(&message, &[table]).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, program);
        assert_eq!(resolved[0].1, vec![payer, loaded[0], loaded[1]]);
    }

    #[test]
    fn test_missing_table_is_error() {
        let payer = Pubkey::new_unique();
        let loaded = Pubkey::new_unique();
        let table = AddressLookupTableAccount {
            key: Pubkey::new_unique(),
            addresses: vec![loaded],
        };
        let ix = instruction(Pubkey::new_unique(), payer, &[loaded]);
        let message = VersionedMessage::V0(
            MessageV0::try_compile(&payer, &[ix], &[table], Hash::new_unique()).unwrap(),
        );
        assert!(matches!(
            loaded_account_keys(&message, &[]),
            Err(ComposeError::LookupTable { .. })
        ));
    }
}
