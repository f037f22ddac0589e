//! Wire-contract constants for foreign key update/delete rules.
//!
//! The rule codes are a fixed table shared with every other implementation
//! of the protocol. They are deliberately NOT derived from an enum's
//! discriminant order: the integers themselves are the contract.

pub const RULE_CASCADE: i32 = 0;
pub const RULE_RESTRICT: i32 = 1;
pub const RULE_SET_NULL: i32 = 2;
pub const RULE_NO_ACTION: i32 = 3;
pub const RULE_SET_DEFAULT: i32 = 4;

const RULES: [(&str, i32); 5] = [
    ("CASCADE", RULE_CASCADE),
    ("RESTRICT", RULE_RESTRICT),
    ("SET NULL", RULE_SET_NULL),
    ("NO ACTION", RULE_NO_ACTION),
    ("SET DEFAULT", RULE_SET_DEFAULT),
];

/// Wire code for a named referential action, if recognized.
pub fn rule_code(name: &str) -> Option<i32> {
    RULES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, code)| *code)
}

/// Canonical name for a wire code, if recognized.
pub fn rule_name(code: i32) -> Option<&'static str> {
    RULES.iter().find(|(_, c)| *c == code).map(|(n, _)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_codes_are_the_wire_contract() {
        assert_eq!(rule_code("CASCADE"), Some(0));
        assert_eq!(rule_code("RESTRICT"), Some(1));
        assert_eq!(rule_code("SET NULL"), Some(2));
        assert_eq!(rule_code("NO ACTION"), Some(3));
        assert_eq!(rule_code("SET DEFAULT"), Some(4));
        assert_eq!(rule_code("no action"), Some(3));
        assert_eq!(rule_code("TRUNCATE"), None);
    }

    #[test]
    fn test_rule_names_invert_codes() {
        for code in 0..=4 {
            let name = rule_name(code).unwrap();
            assert_eq!(rule_code(name), Some(code));
        }
        assert_eq!(rule_name(5), None);
    }
}
