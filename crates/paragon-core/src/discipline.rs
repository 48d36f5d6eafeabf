//! Subject-area code handling
//!
//! Field codes are four-digit subject classification codes; the leading two
//! digits identify the discipline. A researcher's primary discipline is the
//! discipline of their main field.

/// Four-digit subject-area code.
pub type FieldCode = u16;

/// Two-digit discipline prefix of a field code.
pub fn discipline_of(field: FieldCode) -> u16 {
    let mut code = field;
    while code >= 100 {
        code /= 10;
    }
    code
}

/// Short tag for a two-digit discipline code, `None` for unknown codes.
pub fn discipline_tag(code: u16) -> Option<&'static str> {
    let tag = match code {
        10 => "MULT",
        11 => "AGRI",
        12 => "ARTS",
        13 => "BIOC",
        14 => "BUSI",
        15 => "CENG",
        16 => "CHEM",
        17 => "COMP",
        18 => "DECI",
        19 => "EART",
        20 => "ECON",
        21 => "ENER",
        22 => "ENGI",
        23 => "ENVI",
        24 => "IMMU",
        25 => "MATE",
        26 => "MATH",
        27 => "MEDI",
        28 => "NEUR",
        29 => "NURS",
        30 => "PHAR",
        31 => "PHYS",
        32 => "PSYC",
        33 => "SOCI",
        34 => "VETE",
        35 => "DENT",
        36 => "HEAL",
        _ => return None,
    };
    Some(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discipline_is_leading_two_digits() {
        assert_eq!(discipline_of(2002), 20);
        assert_eq!(discipline_of(1701), 17);
        assert_eq!(discipline_of(26), 26);
    }

    #[test]
    fn known_tags() {
        assert_eq!(discipline_tag(20), Some("ECON"));
        assert_eq!(discipline_tag(17), Some("COMP"));
        assert_eq!(discipline_tag(99), None);
    }
}
