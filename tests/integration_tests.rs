//! Integration tests for CodeQuilt document decoding

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use codequilt::{
    decode, decode_with_diagnostics, decode_with_options, parse_header, DecodeError,
    DecodeOptions, Decoder, WarningKind,
};
use pretty_assertions::assert_eq;

fn b64(s: &str) -> String {
    STANDARD.encode(s.as_bytes())
}

// ============================================================================
// Documented scenarios
// ============================================================================

mod scenarios {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_identifier() {
        assert_eq!(decode("[V:1.0;D:[d0=value]]|||d0N").unwrap(), "value\n");
    }

    #[test]
    fn test_trylog_block() {
        let doc = format!("[V:1.0;X:[l0={}]]|||TRYLOG(c1,e){{LOG(i,l0)}}N", b64("started"));
        let expected = "try:\n    logger.info('started')\nexcept Exception as e:\n    logger.error(\"%s\", e, exc_info=True)\n";
        assert_eq!(decode(&doc).unwrap(), expected);
    }

    #[test]
    fn test_unknown_reference_placeholder() {
        let out = decode_with_diagnostics("[V:1.0]|||d0=d99N").unwrap();
        assert_eq!(
            out.content,
            "__UNKNOWN_DYNAMIC_d0__ = __UNKNOWN_DYNAMIC_d99__\n"
        );
        assert!(out
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::UnresolvedReference));
    }

    #[test]
    fn test_missing_closing_bracket_is_fatal() {
        let err = decode("[V:1.0;D:[d0=value]|||d0N").unwrap_err();
        assert!(matches!(err, DecodeError::HeaderFormat { .. }));
    }

    #[test]
    fn test_missing_separator_is_fatal() {
        assert!(matches!(
            decode("[V:1.0]d0N").unwrap_err(),
            DecodeError::HeaderFormat { .. }
        ));
    }
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dynamic_references_resolve_exactly() {
        for k in [0usize, 1, 7, 42, 1000] {
            let name = format!("name_{}", k);
            let doc = format!("[V:1.0;D:[d{}={}]]|||d{}", k, name, k);
            assert_eq!(decode(&doc).unwrap(), name);
        }
    }

    #[test]
    fn test_literal_references_round_trip() {
        let samples = ["hello", "héllo wörld", "with space", "100%"];
        for s in samples {
            let doc = format!("[V:1.0;X:[l3={}]]|||l3", b64(s));
            assert_eq!(decode(&doc).unwrap(), format!("'{}'", s));
        }
    }

    #[test]
    fn test_literal_padding_may_be_omitted() {
        let encoded = b64("ab");
        assert!(encoded.ends_with("=="));
        let doc = format!("[V:1.0;X:[l0={}]]|||l0", encoded.trim_end_matches('='));
        assert_eq!(decode(&doc).unwrap(), "'ab'");
    }

    #[test]
    fn test_literal_quoting() {
        let doc = format!(
            "[V:1.0;X:[l0={},l1={}]]|||l0Nl1",
            b64("it's"),
            b64("two\nlines")
        );
        assert_eq!(decode(&doc).unwrap(), "\"it's\"\n\"\"\"two\nlines\"\"\"");
    }

    #[test]
    fn test_indent_dedent_balance() {
        for n in 1..=5 {
            let body = format!("{}PN{}P", "I".repeat(n), "U".repeat(n));
            let out = decode_with_diagnostics(&format!("[V:1.0]|||{}", body)).unwrap();
            assert_eq!(out.content, format!("{}pass\npass", " ".repeat(4 * n)));
            assert!(out.warnings.is_empty());
        }
    }

    #[test]
    fn test_dedent_below_zero_is_recoverable() {
        let out = decode_with_diagnostics("[V:1.0]|||IPNUUP").unwrap();
        assert_eq!(out.content, "    pass\npass");
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::DedentBelowZero);
        assert_eq!(out.warnings[0].location.as_deref(), Some("offset 14"));
    }

    #[test]
    fn test_warning_locations_are_document_offsets() {
        let out = decode_with_diagnostics("[V:1.0]|||PNd7N").unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].location.as_deref(), Some("d7 at offset 12"));
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let doc = format!(
            "[V:1.0;D:[d0=run,d1=items];X:[l0={}];I:[sys]]|||Dd0(d1):NIFc80 c29 d1:NILOG(d,l0,c80)NUUMAIN(){{d0([])}}N",
            b64("item %s")
        );
        let first = decode(&doc).unwrap();
        let second = decode(&doc).unwrap();
        assert_eq!(first, second);
    }
}

// ============================================================================
// Whole programs
// ============================================================================

mod programs {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_function_with_templates() {
        let doc = format!(
            "[V:1.0;D:[d0=load_config,d1=path,d2=handle,d3=cfg];X:[l0={},l1={}];I:[json,logging]]|||{}",
            b64("loading %s"),
            b64("config.json"),
            concat!(
                "Dd0(d1):NI",
                "GUARD(d1)N",
                "LOG(i,l0,d1)N",
                "WITH(${open(path)},d2){d3=${json.load(handle)}}N",
                "Rd3NU",
                "MAIN(){d0(l1)}N",
            )
        );
        let expected = concat!(
            "import json\n",
            "import logging\n",
            "\n",
            "def load_config(path):\n",
            "    if path is None:\n",
            "        return None\n",
            "    logger.info('loading %s', path)\n",
            "    with open(path) as handle:\n",
            "        cfg = json.load(handle)\n",
            "    return cfg\n",
            "if __name__ == \"__main__\":\n",
            "    load_config('config.json')\n",
        );
        assert_eq!(decode(&doc).unwrap(), expected);
    }

    #[test]
    fn test_class_definition() {
        let doc = "[V:1.0;D:[d0=Point,d1=x]]|||Cd0(c68):NIDc21(c0,d1):NIATTR(c0,d1,d1)NUU";
        assert_eq!(
            decode(doc).unwrap(),
            "class Point(object):\n    def __init__(self, x):\n        self.x = x\n"
        );
    }

    #[test]
    fn test_loop_with_condition() {
        let doc = "[V:1.0;D:[d0=total,d1=items,d2=item]]|||d0=0NFd2 c29 d1:NI?d2>0:NId0+=d2NUK:NIJNUUR d0";
        assert_eq!(
            decode(doc).unwrap(),
            concat!(
                "total = 0\n",
                "for item in items:\n",
                "    if item > 0:\n",
                "        total += item\n",
                "    else:\n",
                "        continue\n",
                "return total",
            )
        );
    }

    #[test]
    fn test_imports_can_be_disabled() {
        let doc = "[V:1.0;I:[os,numpy as np,from typing import Optional]]|||c25N";
        assert_eq!(
            decode(doc).unwrap(),
            "import os\nimport numpy as np\nfrom typing import Optional\n\nos\n"
        );
        assert_eq!(
            decode_with_options(doc, DecodeOptions::new().with_imports(false)).unwrap(),
            "os\n"
        );
    }

    #[test]
    fn test_kept_comments() {
        let doc = "[V:1.0;D:[d0=x];O:[cmt=keep]]|||#'setup'Nd0=1#'one'N";
        assert_eq!(decode(doc).unwrap(), "# setup\nx = 1 # one\n");
    }

    #[test]
    fn test_code_after_comment_starts_new_line() {
        let doc = "[V:1.0;D:[d0=x];O:[cmt=keep]]|||#'note'd0=1N";
        assert_eq!(decode(doc).unwrap(), "# note\nx = 1\n");
    }

    #[test]
    fn test_comment_only_block() {
        let doc = "[V:1.0;O:[cmt=keep]]|||TRYLOG(c1,e){#'todo'}N";
        assert_eq!(
            decode(doc).unwrap(),
            concat!(
                "try:\n",
                "    # todo\n",
                "    pass\n",
                "except Exception as e:\n",
                "    logger.error(\"%s\", e, exc_info=True)\n",
            )
        );
    }
}

// ============================================================================
// Errors and policies
// ============================================================================

mod errors {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strict_policy_fails_on_unresolved() {
        let err = decode_with_options("[V:1.0]|||Nd99N", DecodeOptions::strict()).unwrap_err();
        match err {
            DecodeError::UnresolvedReference { key, position, .. } => {
                assert_eq!(key, "d99");
                assert_eq!(position, 11);
            }
            other => panic!("expected unresolved reference, got {:?}", other),
        }
    }

    #[test]
    fn test_positions_are_document_offsets() {
        let err = decode("[V:1.0]|||d0N'abc").unwrap_err();
        assert!(matches!(err, DecodeError::Lex { position: 13, .. }));

        let err = decode("[V:1.0]|||NLOG(i,l0").unwrap_err();
        assert!(matches!(err, DecodeError::Parse { position: 11, .. }));

        let err = decode("[V:1.0]|||NLOG(q,l0)").unwrap_err();
        assert!(matches!(err, DecodeError::Macro { position: 11, .. }));
    }

    #[test]
    fn test_body_block_errors_point_at_the_token() {
        let err =
            decode_with_options("[V:1.0]|||TRYLOG(c1,e){PNPNd99}", DecodeOptions::strict())
                .unwrap_err();
        match err {
            DecodeError::UnresolvedReference { key, position, .. } => {
                assert_eq!(key, "d99");
                assert_eq!(position, 27);
            }
            other => panic!("expected unresolved reference, got {:?}", other),
        }
    }

    #[test]
    fn test_header_errors_have_position_and_context() {
        let err = decode("[V:1.0;D:[x0=a]]|||PN").unwrap_err();
        assert_eq!(err.position(), Some(10));
        assert!(err.to_string().contains("Header format error at offset 10"));
        assert!(err.to_string().contains("x0=a"));
    }

    #[test]
    fn test_macro_errors_have_context() {
        let err = decode("[V:1.0]|||ATTR(c0,c0)").unwrap_err();
        match err {
            DecodeError::Macro {
                position, context, ..
            } => {
                assert_eq!(position, 10);
                assert!(context.contains("ATTR(c0,c0)"));
            }
            other => panic!("expected macro error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_ascii_digits_are_rejected() {
        assert!(matches!(
            decode("[V:1.0]|||\u{663}").unwrap_err(),
            DecodeError::Lex { position: 10, .. }
        ));
        assert!(matches!(
            decode("[V:1.0;D:[d\u{663}=x]]|||PN").unwrap_err(),
            DecodeError::HeaderFormat { .. }
        ));
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = decode("[V:1.0]|||d0=d1 ` d2").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unrecognized input '`'"));
        assert!(msg.contains("d0=d1 ` d2"));
    }

    #[test]
    fn test_arity_errors_are_fatal() {
        assert!(matches!(
            decode("[V:1.0]|||GUARD(d0,d1)").unwrap_err(),
            DecodeError::Macro { .. }
        ));
        assert!(matches!(
            decode("[V:1.0]|||ATTR(c0)").unwrap_err(),
            DecodeError::Macro { .. }
        ));
    }

    #[test]
    fn test_version_mismatch_is_recoverable() {
        let out = decode_with_diagnostics("[V:0.9]|||PN").unwrap();
        assert_eq!(out.content, "pass\n");
        assert_eq!(out.warnings[0].kind, WarningKind::VersionMismatch);
    }

    #[test]
    fn test_parse_header_is_public() {
        let (header, warnings) = parse_header("[V:1.0;D:[d0=a];C:md5-ffff]").unwrap();
        assert_eq!(header.dynamic["d0"], "a");
        assert_eq!(header.checksum.as_deref(), Some("md5-ffff"));
        assert!(warnings.is_empty());
    }
}

// ============================================================================
// External formatter
// ============================================================================

#[cfg(unix)]
mod formatter {
    use super::*;
    use pretty_assertions::assert_eq;
    use codequilt::FormatterConfig;

    const DOC: &str = "[V:1.0;D:[d0=x]]|||d0=1N";

    #[test]
    fn test_formatter_output_is_used() {
        let options = DecodeOptions::new()
            .with_formatter(FormatterConfig::default().with_command("tr a-z A-Z"));
        assert_eq!(decode_with_options(DOC, options).unwrap(), "X = 1\n");
    }

    #[test]
    fn test_failing_formatter_falls_back() {
        let options =
            DecodeOptions::new().with_formatter(FormatterConfig::default().with_command("false"));
        let out = Decoder::new(options).decode(DOC).unwrap();
        assert_eq!(out.content, "x = 1\n");
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::FormatterUnavailable);
    }
}
