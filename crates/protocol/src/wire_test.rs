//! Wire-format decoder tests

use crate::wire::{PgInet, PgMoney, PgNumeric};

/// Assemble a binary numeric value from its header fields and digit groups
fn numeric_bytes(weight: i16, sign: u16, dscale: u16, groups: &[u16]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(groups.len() as u16).to_be_bytes());
    out.extend_from_slice(&weight.to_be_bytes());
    out.extend_from_slice(&sign.to_be_bytes());
    out.extend_from_slice(&dscale.to_be_bytes());
    for g in groups {
        out.extend_from_slice(&g.to_be_bytes());
    }
    out
}

#[test]
fn numeric_two_decimals() {
    // 12.50
    let raw = numeric_bytes(0, 0x0000, 2, &[12, 5000]);
    assert_eq!(PgNumeric::parse(&raw).unwrap().0, "12.50");
}

#[test]
fn numeric_trailing_zero_groups_are_implicit() {
    // 7.00 stores a single group
    let raw = numeric_bytes(0, 0x0000, 2, &[7]);
    assert_eq!(PgNumeric::parse(&raw).unwrap().0, "7.00");
}

#[test]
fn numeric_below_one() {
    // 0.05
    let raw = numeric_bytes(-1, 0x0000, 2, &[500]);
    assert_eq!(PgNumeric::parse(&raw).unwrap().0, "0.05");
}

#[test]
fn numeric_negative_with_large_integer_part() {
    // -1234567.89
    let raw = numeric_bytes(1, 0x4000, 2, &[123, 4567, 8900]);
    assert_eq!(PgNumeric::parse(&raw).unwrap().0, "-1234567.89");
}

#[test]
fn numeric_integer_with_omitted_low_groups() {
    // 20000 = 2 * 10000^1
    let raw = numeric_bytes(1, 0x0000, 0, &[2]);
    assert_eq!(PgNumeric::parse(&raw).unwrap().0, "20000");
}

#[test]
fn numeric_zero() {
    let raw = numeric_bytes(0, 0x0000, 0, &[]);
    assert_eq!(PgNumeric::parse(&raw).unwrap().0, "0");
}

#[test]
fn numeric_nan() {
    let raw = numeric_bytes(0, 0xC000, 0, &[]);
    assert_eq!(PgNumeric::parse(&raw).unwrap().0, "NaN");
}

#[test]
fn numeric_rejects_truncated_input() {
    assert!(PgNumeric::parse(&[0, 1, 0]).is_err());
    // header promises one group but none follows
    let mut raw = numeric_bytes(0, 0x0000, 0, &[]);
    raw[1] = 1;
    assert!(PgNumeric::parse(&raw).is_err());
}

#[test]
fn money_renders_cents() {
    assert_eq!(PgMoney(123450).to_decimal_string(), "1234.50");
    assert_eq!(PgMoney(-5).to_decimal_string(), "-0.05");
    assert_eq!(PgMoney(0).to_decimal_string(), "0.00");
}

#[test]
fn inet_v4_host_address() {
    use postgres_types::{FromSql, Type};
    // family 2, /32, not cidr, 4 bytes
    let raw = [2u8, 32, 0, 4, 192, 168, 0, 1];
    let inet = PgInet::from_sql(&Type::INET, &raw).unwrap();
    assert_eq!(inet.0, "192.168.0.1");
}

#[test]
fn inet_v4_network_keeps_prefix() {
    use postgres_types::{FromSql, Type};
    let raw = [2u8, 24, 1, 4, 10, 0, 0, 0];
    let inet = PgInet::from_sql(&Type::CIDR, &raw).unwrap();
    assert_eq!(inet.0, "10.0.0.0/24");
}
