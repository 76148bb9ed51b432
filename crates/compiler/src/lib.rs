//! Pascallite Compiler Library
//!
//! Single-pass compilation from Pascallite source to symbolic assembly
//! for a one-accumulator target machine. One call produces two texts: a
//! line-numbered listing ending in a success or failure trailer, and the
//! object program (instruction stream plus a data section for constants
//! and variables).
//!
//! ```rust,ignore
//! let out = plc::compile_source("program p; begin end.");
//! assert!(out.result.is_ok());
//! assert!(out.object.contains("END STRT"));
//! ```
//!
//! The pass is strictly left to right: the parser pulls tokens on demand
//! and emits instructions at every reduction point, with no intermediate
//! representation. See [`parser::Parser`] for the grammar driver and
//! [`codegen::CodeGen`] for the emitter.

pub mod codegen;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod symbol;
pub mod token;

pub use codegen::CodeGen;
pub use error::CompileError;
pub use parser::Parser;
pub use scanner::Scanner;
pub use symbol::{Alloc, Entry, Mode, StoreType, SymbolTable};

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Printed in the listing header and in the object prologue comment.
pub(crate) const SIGNATURE: &str = "PASCALLITE COMPILER";

const SUCCESS_TRAILER: &str = "\nCOMPILATION TERMINATED      0 ERRORS ENCOUNTERED\n";
const FAILURE_TRAILER: &str = "\n\nCOMPILATION TERMINATED      1 ERRORS ENCOUNTERED\n";

/// Everything one compilation produces.
///
/// Both texts are complete and printable whatever `result` holds: on
/// failure the listing ends with the error trailer and the object text
/// stops at the last instruction emitted before the error.
pub struct Compilation {
    pub listing: String,
    pub object: String,
    pub result: Result<(), CompileError>,
}

/// Compile one source text.
pub fn compile_source(source: &str) -> Compilation {
    let mut parser = Parser::new(source);
    let result = parser.parse();

    let mut listing = listing_header();
    listing.push_str(parser.listing());
    match &result {
        Ok(()) => listing.push_str(SUCCESS_TRAILER),
        Err(e) => {
            let _ = write!(listing, "\nError: Line {}: {}", parser.line_number(), e);
            listing.push_str(FAILURE_TRAILER);
        }
    }

    Compilation {
        listing,
        object: parser.object().to_string(),
        result,
    }
}

/// Compile `source_path`, writing the listing and object files.
///
/// The output files are written on failure too, so the listing always
/// records what went wrong. The returned error (if any) is the one the
/// listing trailer reports, except for I/O failures writing the outputs.
pub fn compile_file(
    source_path: &Path,
    listing_path: &Path,
    object_path: &Path,
) -> Result<(), CompileError> {
    let source = fs::read_to_string(source_path).map_err(|e| {
        CompileError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read source file: {}", e),
        ))
    })?;

    let out = compile_source(&source);
    fs::write(listing_path, &out.listing)?;
    fs::write(object_path, &out.object)?;
    out.result
}

/// `STAGE2:` banner with the compile timestamp, then the column headings.
fn listing_header() -> String {
    let now = chrono::Local::now();
    format!(
        "STAGE2:  {}   {}\n\nLINE NO.              SOURCE STATEMENT\n\n",
        SIGNATURE,
        now.format("%a %b %e %H:%M:%S %Y")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_ok(source: &str) -> Compilation {
        let out = compile_source(source);
        if let Err(e) = &out.result {
            panic!("compile failed: {}\nlisting:\n{}", e, out.listing);
        }
        out
    }

    /// Object text split into lines with trailing padding removed.
    fn object_lines(source: &str) -> Vec<String> {
        compile_ok(source)
            .object
            .lines()
            .map(|l| l.trim_end().to_string())
            .collect()
    }

    fn has_line(lines: &[String], wanted: &str) -> bool {
        lines.iter().any(|l| l == wanted)
    }

    #[test]
    fn test_empty_program_frames_object() {
        let lines = object_lines("program p; begin end.");
        assert_eq!(
            lines,
            vec![
                "STRT  NOP          P0 - PASCALLITE COMPILER",
                "      HLT",
                "      END STRT",
            ]
        );
    }

    #[test]
    fn test_read_write_program() {
        let lines = object_lines(
            "program p; var x:integer; begin read(x); write(x); end.",
        );
        assert!(has_line(&lines, "      RDI I0       read(x)"));
        assert!(has_line(&lines, "      PRI I0       write(x)"));
        assert!(has_line(&lines, "I0    BSS 0001     x"));
    }

    #[test]
    fn test_addition_into_variable() {
        let lines = object_lines("program p; var x:integer; begin x := 1 + 2; end.");
        assert!(has_line(&lines, "      LDA I1"));
        assert!(has_line(&lines, "      IAD I2       1 + 2"));
        assert!(has_line(&lines, "      STA I0       x := T0"));
        // Both interned literals get data-section slots; the unspilled
        // temp does not.
        assert!(has_line(&lines, "I1    DEC 0001     1"));
        assert!(has_line(&lines, "I2    DEC 0002     2"));
        assert!(!lines.iter().any(|l| l.starts_with("T0")));
    }

    #[test]
    fn test_boolean_literal_assignment() {
        let lines = object_lines("program p; var b:boolean; begin b := true; end.");
        // `true` was interned as a boolean constant holding 1, then the
        // assignment loads and stores it.
        assert!(has_line(&lines, "      LDA B1"));
        assert!(has_line(&lines, "      STA B0       b := true"));
        assert!(has_line(&lines, "B0    BSS 0001     b"));
        assert!(has_line(&lines, "B1    DEC 0001     true"));
    }

    #[test]
    fn test_while_loop_shape() {
        let lines = object_lines(
            "program p; var i:integer; begin while i > 0 do i := i - 1; end.",
        );
        let expected = [
            "L0    NOP          while",
            "      LDA I0",
            "      ISB I1       i > 0",
            "      AMJ L1",
            "      AZJ L1",
            "      LDA TRUE",
            "      UNJ L1  +1",
            "L1    LDA FALS",
            "      AZJ L2       do",
            "      LDA I0",
            "      ISB I2       i - 1",
            "      STA I0       i := T0",
            "      UNJ L0       end while",
            "L2    NOP",
        ];
        // The whole loop body appears contiguously after the prologue.
        assert_eq!(&lines[1..1 + expected.len()], &expected);
    }

    #[test]
    fn test_if_else_shape() {
        let lines = object_lines(
            "program p; var x:integer; begin if x = 0 then x := 1; else x := 2; end.",
        );
        assert!(has_line(&lines, "      ISB I1       x = 0"));
        assert!(has_line(&lines, "      AZJ L1       if false jump to L1"));
        assert!(has_line(&lines, "      UNJ L2       jump to end if"));
        assert!(has_line(&lines, "L1    NOP          else"));
        assert!(has_line(&lines, "L2    NOP          end if"));
    }

    #[test]
    fn test_if_with_literal_predicate() {
        let lines = object_lines("program p; begin if true then ; ; end.");
        // The literal is loaded, one conditional jump exits, and the
        // label lands on the closing NOP.
        assert!(has_line(&lines, "      LDA B0"));
        let jumps: Vec<_> = lines.iter().filter(|l| l.contains("AZJ")).collect();
        assert_eq!(jumps.len(), 1);
        assert!(jumps[0].contains("L0"));
        assert!(has_line(&lines, "L0    NOP          end if"));
        assert!(has_line(&lines, "B0    DEC 0001     true"));
    }

    #[test]
    fn test_repeat_until_exits_on_true() {
        let lines = object_lines(
            "program p; var i:integer; begin repeat i := i + 1; until i = 3; end.",
        );
        assert!(has_line(&lines, "L0    NOP          repeat"));
        // Loop re-enters while the predicate is zero; true falls through.
        assert!(has_line(&lines, "      AZJ L0       until"));
    }

    #[test]
    fn test_spilled_temp_gets_storage() {
        let lines = object_lines(
            "program p; var a,b,c,d,x:integer; begin x := (a + b) * (c + d); end.",
        );
        assert!(has_line(&lines, "      STA T0       deassign AReg"));
        assert!(has_line(&lines, "T0    BSS 0001     T0"));
        // T1 stayed in the register; no storage for it.
        assert!(!lines.iter().any(|l| l.starts_with("T1")));
    }

    #[test]
    fn test_division_and_modulus() {
        let lines = object_lines(
            "program p; var q,r,a,b:integer; begin q := a div b; r := a mod b; end.",
        );
        assert!(has_line(&lines, "      IDV I3       a div b"));
        assert!(has_line(&lines, "      IDV I3       a mod b"));
        assert!(has_line(&lines, "      STQ T0       store remainder in memory"));
        assert!(has_line(&lines, "      LDA T0       load remainder from memory"));
        assert!(has_line(&lines, "T0    BSS 0001     T0"));
    }

    #[test]
    fn test_negative_constant_data_format() {
        let lines = object_lines(
            "program p; const a = -5; var x:integer; begin x := a; end.",
        );
        assert!(has_line(&lines, "I0    DEC -005     a"));
    }

    #[test]
    fn test_negation_of_variable() {
        let lines = object_lines(
            "program p; var x,y:integer; begin x := -y; end.",
        );
        assert!(has_line(&lines, "      LDA ZERO"));
        assert!(has_line(&lines, "      ISB I1       -y"));
        assert!(has_line(&lines, "ZERO  DEC 0000     ZERO"));
    }

    #[test]
    fn test_not_true_folds_to_false() {
        let lines = object_lines(
            "program p; var b:boolean; begin b := not true; end.",
        );
        // No NOT skeleton: the literal folded at parse time, so the
        // object only loads the interned false constant.
        assert!(!compile_ok("program p; var b:boolean; begin b := not true; end.")
            .object
            .contains("AZJ"));
        assert!(has_line(&lines, "      STA B0       b := false"));
        assert!(has_line(&lines, "B1    DEC 0000     false"));
    }

    #[test]
    fn test_self_assignment_is_elided() {
        let lines = object_lines("program p; var x:integer; begin x := x; end.");
        assert_eq!(
            lines,
            vec![
                "STRT  NOP          P0 - PASCALLITE COMPILER",
                "      HLT",
                "I0    BSS 0001     x",
                "      END STRT",
            ]
        );
    }

    #[test]
    fn test_data_section_lists_allocated_symbols_in_insertion_order() {
        let out = compile_ok(
            "program p; const a = 1; var x:integer; b:boolean; begin x := a + 2; end.",
        );
        let data: Vec<_> = out
            .object
            .lines()
            .skip_while(|l| !l.contains("HLT"))
            .skip(1)
            .take_while(|l| !l.contains("END"))
            .map(|l| l.split_whitespace().next().unwrap().to_string())
            .collect();
        // a, x, b in declaration order, then the literal 2 interned
        // during the expression.
        assert_eq!(data, vec!["I0", "I1", "B0", "I2"]);
    }

    #[test]
    fn test_object_is_deterministic() {
        let source = "program p; var i:integer; begin while i < 10 do i := i + 1; end.";
        let first = compile_ok(source);
        let second = compile_ok(source);
        assert_eq!(first.object, second.object);

        // Listings match too, apart from the timestamped header.
        let body = |listing: &str| listing[listing.find("LINE NO.").unwrap()..].to_string();
        assert_eq!(body(&first.listing), body(&second.listing));
    }

    #[test]
    fn test_listing_success_shape() {
        let out = compile_ok("program p;\nbegin\nend.");
        assert!(out.listing.starts_with("STAGE2:  PASCALLITE COMPILER   "));
        assert!(out.listing.contains("LINE NO.              SOURCE STATEMENT"));
        assert!(out.listing.contains("    1|program p;\n"));
        assert!(out.listing.contains("    2|begin\n"));
        assert!(out.listing.contains("    3|end."));
        assert!(out
            .listing
            .ends_with("\nCOMPILATION TERMINATED      0 ERRORS ENCOUNTERED\n"));
    }

    #[test]
    fn test_unterminated_comment_fails_compilation() {
        let out = compile_source("program p; begin end.{no-end-brace");
        assert!(out.result.is_err());
        assert!(out.listing.contains("Error: Line 1: unexpected end of file."));
        assert!(out
            .listing
            .ends_with("\n\nCOMPILATION TERMINATED      1 ERRORS ENCOUNTERED\n"));
    }

    #[test]
    fn test_error_reports_failing_line() {
        let out = compile_source("program p;\nvar x:integer;\nbegin\nx := y;\nend.");
        assert!(out.result.is_err());
        assert!(out.listing.contains("Error: Line 4: reference to undefined constant"));
    }

    #[test]
    fn test_object_stops_at_error() {
        let out = compile_source(
            "program p; var x:integer; begin x := 1; x := true; end.",
        );
        assert!(out.result.is_err());
        // The first assignment made it out before the type error.
        assert!(out.object.contains("STA I0"));
        assert!(!out.object.contains("HLT"));
    }

    #[test]
    fn test_predicate_must_be_boolean() {
        let out = compile_source(
            "program p; var i:integer; begin if i + 1 then i := 0; end.",
        );
        assert_eq!(
            out.result.unwrap_err().to_string(),
            "predicate must be boolean valued"
        );
    }

    #[test]
    fn test_long_names_compile() {
        let out = compile_source(
            "program p; var averylongvariablename:integer; \
             begin averylongvariablename := 1; end.",
        );
        assert!(out.result.is_ok());
        // Truncated to 15 characters everywhere.
        assert!(out.object.contains("averylongvariab :="));
    }

    #[test]
    fn test_compile_file_round_trip() {
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("sum.pas");
        let listing_path = dir.path().join("sum.lst");
        let object_path = dir.path().join("sum.obj");

        fs::write(
            &source_path,
            "program sum;\nvar a,b,c:integer;\nbegin\nread(a,b);\nc := a + b;\nwrite(c);\nend.\n",
        )
        .unwrap();

        compile_file(&source_path, &listing_path, &object_path).unwrap();

        let listing = fs::read_to_string(&listing_path).unwrap();
        assert!(listing.contains("    4|read(a,b);"));
        assert!(listing.contains("0 ERRORS ENCOUNTERED"));

        let object = fs::read_to_string(&object_path).unwrap();
        assert!(object.contains("RDI I0"));
        assert!(object.contains("IAD"));
        assert!(object.contains("PRI I2"));
        assert!(object.contains("END STRT"));
    }

    #[test]
    fn test_compile_file_writes_failure_listing() {
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("bad.pas");
        let listing_path = dir.path().join("bad.lst");
        let object_path = dir.path().join("bad.obj");

        fs::write(&source_path, "program bad; begin x := 1; end.").unwrap();

        let err = compile_file(&source_path, &listing_path, &object_path).unwrap_err();
        assert_eq!(err.to_string(), "reference to undefined constant");

        let listing = fs::read_to_string(&listing_path).unwrap();
        assert!(listing.contains("1 ERRORS ENCOUNTERED"));
    }

    #[test]
    fn test_compile_file_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = compile_file(
            &dir.path().join("nope.pas"),
            &dir.path().join("nope.lst"),
            &dir.path().join("nope.obj"),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Io(_)));
    }
}
