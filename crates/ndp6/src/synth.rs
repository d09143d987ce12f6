//! Address synthesiser: fills the host bits of a prefix-derived address.

use std::net::Ipv6Addr;

use crate::error::{Error, Result};
use crate::io::StableDerive;
use crate::types::{AddrGenMode, AddressEntry, StableType};

/// Upper bound on stable-privacy DAD retries (spec §9 open question:
/// the 8-bit counter is otherwise unbounded). Not part of the documented
/// retry semantics, just a backstop against an endlessly failing deriver.
pub const MAX_DAD_RETRIES: u8 = 128;

fn host_bits_are_zero(address: &Ipv6Addr) -> bool {
    let octets = address.octets();
    octets[8..16].iter().all(|&b| b == 0)
}

fn write_host_bits(address: &mut Ipv6Addr, iid: u64) {
    let mut octets = address.octets();
    octets[8..16].copy_from_slice(&iid.to_be_bytes());
    *address = Ipv6Addr::from(octets);
}

/// Fill `entry.address`'s host bits in place, selecting the strategy named
/// by `mode`. `iid` is the 64-bit interface identifier installed by the
/// owner (only consulted in EUI-64 mode); `ifname`/`network_id` feed
/// stable-privacy derivation.
#[allow(clippy::too_many_arguments)]
pub fn complete_address(
    mode: AddrGenMode,
    iid: u64,
    entry: &mut AddressEntry,
    deriver: &mut dyn StableDerive,
    stable_type: StableType,
    ifname: &str,
    network_id: Option<&str>,
) -> Result<()> {
    match mode {
        AddrGenMode::Eui64 => {
            if iid == 0 {
                return Err(Error::AddressSynthesisFailed(
                    "eui64 mode requires a non-zero IID".into(),
                ));
            }
            if host_bits_are_zero(&entry.address) {
                write_host_bits(&mut entry.address, iid);
                Ok(())
            } else {
                Err(Error::AddressSynthesisFailed(
                    "eui64 has no retry budget".into(),
                ))
            }
        }
        AddrGenMode::StablePrivacy => {
            if entry.dad_counter >= MAX_DAD_RETRIES {
                return Err(Error::AddressSynthesisFailed(
                    "stable-privacy DAD retry cap exceeded".into(),
                ));
            }
            let derived = deriver.derive_stable(
                stable_type,
                &entry.address,
                ifname,
                network_id,
                entry.dad_counter,
            )?;
            entry.address = derived;
            entry.dad_counter += 1;
            Ok(())
        }
    }
}
