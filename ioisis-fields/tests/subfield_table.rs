//! Table-driven subfield parsing cases, ported from the historical
//! reference suite (UTF-8 byte variant).

use ioisis_fields::subfield::{SubfieldConfig, SubfieldParser};
use pretty_assertions::assert_eq;

struct Case {
    name: &'static str,
    field: &'static str,
    expected: &'static [(&'static str, &'static str)],
    config: SubfieldConfig,
}

fn cfg(prefix: &str) -> SubfieldConfig {
    SubfieldConfig {
        prefix: prefix.as_bytes().to_vec(),
        ..SubfieldConfig::default()
    }
}

fn check(case: &Case) {
    let parser = SubfieldParser::new(case.config.clone());
    let expected: Vec<(Vec<u8>, Vec<u8>)> = case
        .expected
        .iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect();
    assert_eq!(
        parser.parse(case.field.as_bytes()),
        expected,
        "case {}",
        case.name,
    );
}

#[test]
fn empty_input() {
    check(&Case {
        name: "empty_false",
        field: "",
        expected: &[],
        config: cfg("x"),
    });
    check(&Case {
        name: "empty_true",
        field: "",
        expected: &[("", "")],
        config: SubfieldConfig {
            empty: true,
            ..cfg("x")
        },
    });
}

#[test]
fn single_nonempty_subfield() {
    check(&Case {
        name: "single_nonempty_subfield_first",
        field: "data",
        expected: &[("", "data")],
        config: cfg("^"),
    });
    check(&Case {
        name: "single_nonempty_subfield_no_first",
        field: "data",
        expected: &[("a", "ta")],
        config: cfg("d"),
    });
    check(&Case {
        name: "single_nonempty_subfield_empty_first",
        field: "data",
        expected: &[("", ""), ("a", "ta")],
        config: SubfieldConfig {
            empty: true,
            ..cfg("d")
        },
    });
}

#[test]
fn non_subfield_prefix() {
    check(&Case {
        name: "non_subfield_prefix",
        field: "data",
        expected: &[("", "d"), ("t", "a")],
        config: cfg("a"),
    });
}

#[test]
fn multibyte_prefixes() {
    check(&Case {
        name: "utf8_prefix",
        field: "d\u{e1}t\u{e1}",
        expected: &[("", "d"), ("t", "\u{e1}")],
        config: cfg("\u{e1}"),
    });
    check(&Case {
        name: "multibyte_ascii_prefix",
        field: "#-#ak0#-ak-#",
        expected: &[("#", "ak0"), ("a", "k-#")],
        config: cfg("#-"),
    });
}

#[test]
fn key_length_variants() {
    check(&Case {
        name: "length_2_ignore_empty",
        field: "data",
        expected: &[("", "d")],
        config: SubfieldConfig {
            length: 2,
            ..cfg("a")
        },
    });
    check(&Case {
        name: "length_2_keep_empty",
        field: "data",
        expected: &[("", "d"), ("ta", "")],
        config: SubfieldConfig {
            length: 2,
            empty: true,
            ..cfg("a")
        },
    });
    check(&Case {
        name: "length_0_ignore_empty",
        field: "data",
        expected: &[("", "d"), ("1", "t")],
        config: SubfieldConfig {
            length: 0,
            ..cfg("a")
        },
    });
    check(&Case {
        name: "length_0_ignore_empty_no_number",
        field: "data",
        expected: &[("", "d"), ("", "t")],
        config: SubfieldConfig {
            length: 0,
            number: false,
            ..cfg("a")
        },
    });
    check(&Case {
        name: "length_0_keep_empty",
        field: "data",
        expected: &[("", "d"), ("1", "t"), ("2", "")],
        config: SubfieldConfig {
            length: 0,
            empty: true,
            ..cfg("a")
        },
    });
    check(&Case {
        name: "length_0_keep_empty_no_number",
        field: "\u{f0}ata",
        expected: &[("", "\u{f0}"), ("", "t"), ("", "")],
        config: SubfieldConfig {
            length: 0,
            empty: true,
            number: false,
            ..cfg("a")
        },
    });
    check(&Case {
        name: "length_0_keep_empty_zero",
        field: "data",
        expected: &[("0", "d"), ("1", "t"), ("2", "")],
        config: SubfieldConfig {
            length: 0,
            empty: true,
            zero: true,
            ..cfg("a")
        },
    });
}

#[test]
fn first_key_variants() {
    check(&Case {
        name: "first_unused",
        field: "ioisis test",
        expected: &[("s", " test")],
        config: SubfieldConfig {
            first: b"1".to_vec(),
            ..cfg("i")
        },
    });
    check(&Case {
        name: "first_empty",
        field: "ioisis test",
        expected: &[("1", ""), ("o", ""), ("s", ""), ("s1", " test")],
        config: SubfieldConfig {
            first: b"1".to_vec(),
            empty: true,
            ..cfg("i")
        },
    });
    check(&Case {
        name: "first_empty_no_number",
        field: "ioisis test",
        expected: &[("1", ""), ("o", ""), ("s", ""), ("s", " test")],
        config: SubfieldConfig {
            first: b"1".to_vec(),
            empty: true,
            number: false,
            ..cfg("i")
        },
    });
    check(&Case {
        name: "first_empty_zero",
        field: "ioisis test",
        expected: &[("_0", ""), ("o0", ""), ("s0", ""), ("s1", " test")],
        config: SubfieldConfig {
            first: b"_".to_vec(),
            empty: true,
            zero: true,
            ..cfg("i")
        },
    });
    check(&Case {
        name: "first_with_3_bytes",
        field: "ioisis test",
        expected: &[("1st", "io"), ("i", "s test")],
        config: SubfieldConfig {
            first: b"1st".to_vec(),
            ..cfg("is")
        },
    });
    check(&Case {
        name: "first_with_3_bytes_and_remaining_with_length_2",
        field: "ioisis test",
        expected: &[("1st", "io"), ("is", " test")],
        config: SubfieldConfig {
            first: b"1st".to_vec(),
            length: 2,
            ..cfg("is")
        },
    });
    check(&Case {
        name: "first_with_3_bytes_and_remaining_with_length_2_number",
        field: "ioisis test isis numbered",
        expected: &[("1st", "io"), ("is", " test "), ("is1", " numbered")],
        config: SubfieldConfig {
            first: b"1st".to_vec(),
            length: 2,
            ..cfg("is")
        },
    });
    check(&Case {
        name: "first_with_3_bytes_and_remaining_with_length_2_number_zero",
        field: "ioisis t\u{eb}\u{a7}t isis numbered",
        expected: &[("1st0", "io"), ("is0", " t\u{eb}\u{a7}t "), ("is1", " numbered")],
        config: SubfieldConfig {
            first: b"1st".to_vec(),
            length: 2,
            zero: true,
            ..cfg("is")
        },
    });
    check(&Case {
        name: "first_with_3_bytes_and_remaining_with_length_2_no_number",
        field: "ioisis test isisnt numbered",
        expected: &[("1st", "io"), ("is", " test "), ("is", "nt numbered")],
        config: SubfieldConfig {
            first: b"1st".to_vec(),
            length: 2,
            number: false,
            ..cfg("is")
        },
    });
}

#[test]
fn lowering_and_numbering() {
    let field = "7Asui\u{f1}\u{bc}suidn7AIDjqoiw7siojAipoo7Aidosijd";
    check(&Case {
        name: "lower_no_number_length_2",
        field,
        expected: &[
            ("su", "i\u{f1}\u{bc}suidn"),
            ("id", "jqoiw7siojAipoo"),
            ("id", "osijd"),
        ],
        config: SubfieldConfig {
            length: 2,
            lower: true,
            number: false,
            ..cfg("7A")
        },
    });
    check(&Case {
        name: "number_no_lower_length_2",
        field,
        expected: &[
            ("su", "i\u{f1}\u{bc}suidn"),
            ("ID", "jqoiw7siojAipoo"),
            ("id", "osijd"),
        ],
        config: SubfieldConfig {
            length: 2,
            ..cfg("7A")
        },
    });
    check(&Case {
        name: "lower_number_zero_length_2",
        field,
        expected: &[
            ("su0", "i\u{f1}\u{bc}suidn"),
            ("id0", "jqoiw7siojAipoo"),
            ("id1", "osijd"),
        ],
        config: SubfieldConfig {
            length: 2,
            lower: true,
            zero: true,
            ..cfg("7A")
        },
    });
    check(&Case {
        name: "lower_first_empty",
        field: "",
        expected: &[("first", "")],
        config: SubfieldConfig {
            lower: true,
            first: b"FIRST".to_vec(),
            empty: true,
            ..cfg("^")
        },
    });
}
