//! Wire-format decoders for types the driver has no native mapping for
//!
//! These parse the documented PostgreSQL binary formats directly, the same
//! way the route registry's own queries decode catalog values. `numeric` in
//! particular must not round-trip through a float, so it is re-rendered from
//! its base-10000 digit groups into a decimal string.

use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use postgres_types::{FromSql, Type};

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// A `numeric` value as a lossless decimal string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgNumeric(pub String);

impl PgNumeric {
    /// Parse the binary `numeric` wire format.
    ///
    /// Layout: i16 digit-group count, i16 weight (index of the first group
    /// relative to the decimal point, in units of four digits), u16 sign,
    /// u16 display scale, then the base-10000 digit groups.
    pub fn parse(raw: &[u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() < 8 {
            return Err(format!("numeric value too short: {} bytes", raw.len()).into());
        }

        let ndigits = be_u16(raw, 0) as usize;
        let weight = be_i16(raw, 2);
        let sign = be_u16(raw, 4);
        let dscale = be_u16(raw, 6) as usize;

        match sign {
            NUMERIC_NAN => return Ok(PgNumeric("NaN".to_string())),
            NUMERIC_PINF => return Ok(PgNumeric("Infinity".to_string())),
            NUMERIC_NINF => return Ok(PgNumeric("-Infinity".to_string())),
            NUMERIC_POS | NUMERIC_NEG => {}
            other => return Err(format!("invalid numeric sign: {other:#x}").into()),
        }

        if raw.len() < 8 + ndigits * 2 {
            return Err("numeric digit groups truncated".into());
        }

        let group = |i: usize| -> u16 {
            if i < ndigits {
                be_u16(raw, 8 + i * 2)
            } else {
                0
            }
        };

        let mut out = String::new();
        if sign == NUMERIC_NEG {
            out.push('-');
        }

        if weight < 0 {
            out.push('0');
        } else {
            for i in 0..=(weight as usize) {
                if i == 0 {
                    out.push_str(&group(0).to_string());
                } else {
                    out.push_str(&format!("{:04}", group(i)));
                }
            }
        }

        if dscale > 0 {
            // the group at weight position -k is stored at index weight + k;
            // values below one have zero groups between the point and the
            // first stored group
            let mut frac = String::new();
            let mut k = 1i32;
            while frac.len() < dscale {
                let idx = i32::from(weight) + k;
                let g = if idx >= 0 && (idx as usize) < ndigits {
                    be_u16(raw, 8 + idx as usize * 2)
                } else {
                    0
                };
                frac.push_str(&format!("{g:04}"));
                k += 1;
            }
            frac.truncate(dscale);
            out.push('.');
            out.push_str(&frac);
        }

        Ok(PgNumeric(out))
    }
}

fn be_u16(b: &[u8], i: usize) -> u16 {
    u16::from_be_bytes([b[i], b[i + 1]])
}

fn be_i16(b: &[u8], i: usize) -> i16 {
    i16::from_be_bytes([b[i], b[i + 1]])
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        PgNumeric::parse(raw)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// A `money` value in integral cents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgMoney(pub i64);

impl PgMoney {
    /// Decimal rendering with two fractional digits
    pub fn to_decimal_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl<'a> FromSql<'a> for PgMoney {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() != 8 {
            return Err(format!("invalid size for money: {}", raw.len()).into());
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(PgMoney(i64::from_be_bytes(buf)))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::MONEY
    }
}

const PGSQL_AF_INET: u8 = 2;
const PGSQL_AF_INET6: u8 = 3;

/// An `inet`/`cidr` value rendered as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgInet(pub String);

impl<'a> FromSql<'a> for PgInet {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() < 4 {
            return Err("inet value too short".into());
        }
        let family = raw[0];
        let bits = raw[1];
        let is_cidr = raw[2] != 0;
        let addr_len = raw[3] as usize;
        let addr = &raw[4..];
        if addr.len() != addr_len {
            return Err("inet address length mismatch".into());
        }

        let (ip, full) = match (family, addr_len) {
            (PGSQL_AF_INET, 4) => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(addr);
                (IpAddr::V4(Ipv4Addr::from(buf)), 32)
            }
            (PGSQL_AF_INET6, 16) => {
                let mut buf = [0u8; 16];
                buf.copy_from_slice(addr);
                (IpAddr::V6(Ipv6Addr::from(buf)), 128)
            }
            _ => return Err(format!("unknown inet family: {family}").into()),
        };

        let text = if is_cidr || bits != full {
            format!("{ip}/{bits}")
        } else {
            ip.to_string()
        };
        Ok(PgInet(text))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INET || *ty == Type::CIDR
    }
}

/// Raw `json`/`jsonb` text, passed through without re-parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJson(pub String);

impl<'a> FromSql<'a> for RawJson {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let body = if *ty == Type::JSONB {
            let (&version, rest) = raw
                .split_first()
                .ok_or_else(|| Box::<dyn Error + Sync + Send>::from("empty jsonb value"))?;
            if version != 1 {
                return Err(format!("unknown jsonb version: {version}").into());
            }
            rest
        } else {
            raw
        };
        Ok(RawJson(std::str::from_utf8(body)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::JSON || *ty == Type::JSONB
    }
}
