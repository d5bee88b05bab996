//! Storage key layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `order:<id>` | encoded [`Order`](shared::Order) |
//! | `orders` | set of every live `order:<id>` key |

/// Name of the index set enumerating all live order keys
pub const ORDERS_INDEX: &str = "orders";

const ORDER_KEY_PREFIX: &str = "order:";

/// Primary key for an order id
pub fn order_key(id: u64) -> String {
    format!("{}{}", ORDER_KEY_PREFIX, id)
}

/// Inverse of [`order_key`]. Only canonical decimal forms are accepted,
/// so every id has exactly one key.
pub fn parse_order_key(key: &str) -> Option<u64> {
    let digits = key.strip_prefix(ORDER_KEY_PREFIX)?;
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
    {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_key_format() {
        assert_eq!(order_key(0), "order:0");
        assert_eq!(order_key(42), "order:42");
        assert_eq!(order_key(u64::MAX), "order:18446744073709551615");
    }

    #[test]
    fn test_parse_inverts_order_key() {
        for id in [0, 1, 42, 1_000_000, u64::MAX] {
            assert_eq!(parse_order_key(&order_key(id)), Some(id));
        }
    }

    #[test]
    fn test_parse_rejects_non_canonical() {
        assert_eq!(parse_order_key("orders"), None);
        assert_eq!(parse_order_key("order:"), None);
        assert_eq!(parse_order_key("order:007"), None);
        assert_eq!(parse_order_key("order:+7"), None);
        assert_eq!(parse_order_key("order:-1"), None);
        assert_eq!(parse_order_key("order:18446744073709551616"), None);
        assert_eq!(parse_order_key("item:7"), None);
    }
}
