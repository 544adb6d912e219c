use crate::model::{Checksum, ChecksumOption, DeliveryToken, HostAddress};
use std::collections::HashSet;

/// Returns the connection key used to identify a host in a [`crate::model`]
/// worker pool: `"{host}:{port}"`.
pub fn connection_key(addr: &HostAddress) -> String {
    format!("{}:{}", addr.host, addr.port)
}

/// Builds a [`DeliveryToken`] pairing an ack-id with the output host that
/// must be contacted to ack or nack it.
pub fn create_delivery_token(ack_id: String, hostport: String) -> DeliveryToken {
    DeliveryToken { ack_id, hostport }
}

pub fn get_ack_id_from_delivery_token(token: &DeliveryToken) -> &str {
    &token.ack_id
}

pub fn get_hostport_from_delivery_token(token: &DeliveryToken) -> &str {
    &token.hostport
}

/// Computes the checksum dictated by `option` over `data`. `ChecksumOption::None`
/// yields `Checksum::None`, signaling the worker should send the message
/// without a checksum field set.
pub fn calc_crc(data: &[u8], option: ChecksumOption) -> Checksum {
    match option {
        ChecksumOption::None => Checksum::None,
        ChecksumOption::Crc32Ieee => Checksum::Crc32(crc32fast::hash(data)),
        ChecksumOption::Md5 => {
            let digest = md5::compute(data);
            Checksum::Md5(digest.0)
        }
    }
}

/// Computes the set-difference between the current and desired connection
/// key sets: `(to_add, to_remove)`. The two returned sets are disjoint from
/// each other and from the unchanged intersection.
pub fn host_set_diff(
    current: &HashSet<String>,
    desired: &HashSet<String>,
) -> (HashSet<String>, HashSet<String>) {
    let to_add = desired.difference(current).cloned().collect();
    let to_remove = current.difference(desired).cloned().collect();
    (to_add, to_remove)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_key_formats_host_and_port() {
        let addr = HostAddress {
            host: "1.2.3.4".to_string(),
            port: 9000,
        };
        assert_eq!(connection_key(&addr), "1.2.3.4:9000");
    }

    #[test]
    fn delivery_token_round_trips() {
        let token = create_delivery_token("ack0".to_string(), "0:0".to_string());
        assert_eq!(get_ack_id_from_delivery_token(&token), "ack0");
        assert_eq!(get_hostport_from_delivery_token(&token), "0:0");
    }

    #[test]
    fn crc32_ieee_matches_known_value() {
        let Checksum::Crc32(v) = calc_crc(b"aaa", ChecksumOption::Crc32Ieee) else {
            panic!("expected Crc32 variant");
        };
        assert_eq!(v, 4_027_020_077);
    }

    #[test]
    fn md5_is_raw_sixteen_byte_digest() {
        let Checksum::Md5(digest) = calc_crc(b"test_msg", ChecksumOption::Md5) else {
            panic!("expected Md5 variant");
        };
        assert_eq!(digest, md5::compute(b"test_msg").0);
    }

    #[test]
    fn no_checksum_option_yields_none() {
        assert_eq!(calc_crc(b"anything", ChecksumOption::None), Checksum::None);
    }

    #[test]
    fn host_set_diff_is_disjoint() {
        let current: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let desired: HashSet<String> = ["b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let (to_add, to_remove) = host_set_diff(&current, &desired);
        assert_eq!(to_add, ["d"].iter().map(|s| s.to_string()).collect());
        assert_eq!(to_remove, ["a"].iter().map(|s| s.to_string()).collect());
    }
}
