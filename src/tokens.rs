//! Field-level parsers for the dhcpd text formats.
//!
//! Both the lease database and the subnet configuration are line-oriented;
//! these combinators pull the typed values out of a line once the caller
//! has recognized its keyword.

use std::net::Ipv4Addr;

use chrono::NaiveDateTime;
use nom::bytes::complete::{take_until, take_while_m_n};
use nom::character::complete::{char, digit1, space1};
use nom::combinator::{map, map_res, opt, recognize};
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;

fn octet(input: &str) -> IResult<&str, u8> {
    map_res(digit1, str::parse)(input)
}

pub fn dotted_quad(input: &str) -> IResult<&str, Ipv4Addr> {
    map(
        tuple((octet, char('.'), octet, char('.'), octet, char('.'), octet)),
        |(a, _, b, _, c, _, d)| Ipv4Addr::new(a, b, c, d),
    )(input)
}

fn hex_octet(input: &str) -> IResult<&str, u8> {
    map_res(
        take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
        |digits| u8::from_str_radix(digits, 16),
    )(input)
}

pub fn mac_address(input: &str) -> IResult<&str, [u8; 6]> {
    map(
        tuple((
            hex_octet,
            char(':'),
            hex_octet,
            char(':'),
            hex_octet,
            char(':'),
            hex_octet,
            char(':'),
            hex_octet,
            char(':'),
            hex_octet,
        )),
        |(a, _, b, _, c, _, d, _, e, _, f)| [a, b, c, d, e, f],
    )(input)
}

/// First double-quoted substring, quotes stripped. Escape sequences inside
/// the quotes (dhcpd writes octal escapes into uid strings) are kept
/// verbatim.
pub fn quoted(input: &str) -> IResult<&str, &str> {
    preceded(
        take_until("\""),
        delimited(char('"'), take_until("\""), char('"')),
    )(input)
}

fn datetime(input: &str) -> IResult<&str, i64> {
    map_res(
        recognize(tuple((
            digit1,
            char('/'),
            digit1,
            char('/'),
            digit1,
            space1,
            digit1,
            char(':'),
            digit1,
            char(':'),
            digit1,
        ))),
        |text: &str| {
            NaiveDateTime::parse_from_str(text, "%Y/%m/%d %H:%M:%S")
                .map(|stamp| stamp.and_utc().timestamp())
        },
    )(input)
}

/// Timestamp of a `starts`/`ends` line: the keyword has already been
/// stripped, leaving an optional day-of-week digit and then
/// `YYYY/MM/DD HH:MM:SS`, interpreted as UTC.
pub fn lease_time(input: &str) -> IResult<&str, i64> {
    preceded(pair(space1, opt(pair(digit1, space1))), datetime)(input)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    #[test]
    fn dotted_quad() {
        let (rest, address) = super::dotted_quad("172.30.3.189 {").unwrap();
        assert_eq!(address, Ipv4Addr::new(172, 30, 3, 189));
        assert_eq!(rest, " {");

        assert!(super::dotted_quad("256.1.1.1").is_err());
        assert!(super::dotted_quad("10.0.0").is_err());
    }

    #[test]
    fn mac_address() {
        let (_, octets) = super::mac_address("64:20:0c:69:75:60;").unwrap();
        assert_eq!(octets, [0x64, 0x20, 0x0c, 0x69, 0x75, 0x60]);

        // Uppercase input is accepted
        let (_, octets) = super::mac_address("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(octets, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);

        assert!(super::mac_address("64:20:0c").is_err());
    }

    #[test]
    fn quoted() {
        let (_, value) = super::quoted(" \"Gregs-iPhone\";").unwrap();
        assert_eq!(value, "Gregs-iPhone");

        // Octal escapes stay verbatim
        let (_, value) = super::quoted(r#" "\001d \014iu`";"#).unwrap();
        assert_eq!(value, r"\001d \014iu`");

        assert!(super::quoted("no quotes here").is_err());
    }

    #[test]
    fn lease_time_with_weekday() {
        let (_, stamp) = super::lease_time(" 6 2012/12/01 15:07:57;").unwrap();
        assert_eq!(stamp, 1354374477);
    }

    #[test]
    fn lease_time_without_weekday() {
        let (_, stamp) = super::lease_time(" 1970/01/01 00:00:00;").unwrap();
        assert_eq!(stamp, 0);
    }

    #[test]
    fn lease_time_rejects_garbage() {
        assert!(super::lease_time(" never;").is_err());
        assert!(super::lease_time(" 2012/13/40 99:99:99;").is_err());
    }
}
