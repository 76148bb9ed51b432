//! Recursive-descent grammar driver.
//!
//! One method per production. There is no AST: at every reduction point
//! the parser pops two operands and an operator from the stacks in
//! [`CodeGen`] and asks it to emit the operation, so object text streams
//! out while the source is still being read. Lookahead is a single token
//! held in `self.token`.
//!
//! Token-flow contract: each statement parser leaves the terminating `;`
//! in the current-token slot. The `;` is consumed either by the
//! null-statement arm of `exec_stmt` or by `if_stmt`'s advance after the
//! controlled statement.

use crate::codegen::CodeGen;
use crate::error::CompileError;
use crate::scanner::{EOF_TOKEN, Scanner};
use crate::symbol::{Alloc, Mode, StoreType, SymbolTable};
use crate::token;

#[derive(Debug)]
pub struct Parser {
    scanner: Scanner,
    token: String,
    table: SymbolTable,
    codegen: CodeGen,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Parser {
            scanner: Scanner::new(source),
            token: String::new(),
            table: SymbolTable::new(),
            codegen: CodeGen::new(),
        }
    }

    /// Run the whole pass over the source.
    pub fn parse(&mut self) -> Result<(), CompileError> {
        // Prime the one-character lookahead before the first token.
        self.scanner.next_char();
        self.advance()?;
        if self.token != "program" {
            return Err(CompileError::Syntax(
                "Keyword \"program\" expected".to_string(),
            ));
        }
        self.prog()
    }

    /// Line number the scanner last echoed; errors report this.
    pub fn line_number(&self) -> u32 {
        self.scanner.line_number()
    }

    /// Listing body produced so far.
    pub fn listing(&self) -> &str {
        self.scanner.listing()
    }

    /// Object text produced so far.
    pub fn object(&self) -> &str {
        self.codegen.output()
    }

    fn advance(&mut self) -> Result<(), CompileError> {
        self.token = self.scanner.next_token()?;
        Ok(())
    }

    // =======================================================================
    // Declarations
    // =======================================================================

    /// prog = 'program' id ';' [consts] [vars] block '.'
    fn prog(&mut self) -> Result<(), CompileError> {
        self.prog_stmt()?;
        if self.token == "const" {
            self.consts()?;
        }
        if self.token == "var" {
            self.vars()?;
        }
        if self.token != "begin" {
            return Err(CompileError::Syntax(
                "keyword \"begin\" expected".to_string(),
            ));
        }
        self.begin_end_stmt(false)?;
        if self.token != EOF_TOKEN {
            return Err(CompileError::Syntax(
                "no text may follow \"end\" expected".to_string(),
            ));
        }
        Ok(())
    }

    fn prog_stmt(&mut self) -> Result<(), CompileError> {
        self.advance()?;
        if !token::is_non_key_id(&self.token) {
            return Err(CompileError::Syntax("program name expected".to_string()));
        }
        let name = self.token.clone();

        self.advance()?;
        if self.token != ";" {
            return Err(CompileError::Syntax("semicolon expected".to_string()));
        }
        self.advance()?;

        self.table
            .insert(&name, StoreType::ProgName, Mode::Constant, &name, Alloc::No, 0)?;
        self.codegen.code(&mut self.table, "program", "", "")
    }

    fn consts(&mut self) -> Result<(), CompileError> {
        self.advance()?;
        if !token::is_non_key_id(&self.token) {
            return Err(CompileError::Syntax(
                "non-keyword identifier must follow \"const\"".to_string(),
            ));
        }
        self.const_stmts()
    }

    /// consts = 'const' { id '=' const_expr ';' }
    ///
    /// Constant expressions are folded here: a sign prefixes the stored
    /// literal, `not` flips the stored boolean. Nothing is emitted.
    fn const_stmts(&mut self) -> Result<(), CompileError> {
        let name = self.token.clone();

        self.advance()?;
        if self.token != "=" {
            return Err(CompileError::Syntax("\"=\" expected".to_string()));
        }

        self.advance()?;
        let mut rhs = self.token.clone();
        if rhs != "+"
            && rhs != "-"
            && rhs != "not"
            && !token::is_non_key_id(&rhs)
            && rhs != "true"
            && rhs != "false"
            && self.table.which_type(&rhs)? != StoreType::Integer
        {
            return Err(CompileError::Syntax(
                "token to right of \"=\" illegal".to_string(),
            ));
        }

        if rhs == "+" || rhs == "-" {
            self.advance()?;
            if self.table.which_type(&self.token)? != StoreType::Integer {
                return Err(CompileError::Type(
                    "integer expected after sign".to_string(),
                ));
            }
            rhs = format!("{}{}", rhs, self.token);
        }
        if rhs == "not" {
            self.advance()?;
            if self.table.which_type(&self.token)? != StoreType::Boolean {
                return Err(CompileError::Type(
                    "boolean expected after not".to_string(),
                ));
            }
            rhs = if self.token == "true" {
                "false".to_string()
            } else if self.token == "false" {
                "true".to_string()
            } else {
                // `not` of a boolean constant folds through its value.
                let index = self.table.find_index(&self.token)?;
                if self.table.get(index).value == "0" {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            };
        }

        self.advance()?;
        if self.token != ";" {
            return Err(CompileError::Syntax("semicolon expected".to_string()));
        }

        let data_type = self.table.which_type(&rhs)?;
        let value = self.table.which_value(&rhs)?;
        self.table
            .insert(&name, data_type, Mode::Constant, &value, Alloc::Yes, 1)?;

        self.advance()?;
        if self.token != "begin" && self.token != "var" && !token::is_non_key_id(&self.token) {
            return Err(CompileError::Syntax(
                "non-keyword identifier,\"begin\", or \"var\" expected".to_string(),
            ));
        }
        if token::is_non_key_id(&self.token) {
            self.const_stmts()?;
        }
        Ok(())
    }

    fn vars(&mut self) -> Result<(), CompileError> {
        self.advance()?;
        if !token::is_non_key_id(&self.token) {
            return Err(CompileError::Syntax(
                "non-keyword identifier must follow \"var\"".to_string(),
            ));
        }
        self.var_stmts()
    }

    /// vars = 'var' { id_list ':' ('integer'|'boolean') ';' }
    fn var_stmts(&mut self) -> Result<(), CompileError> {
        if !token::is_non_key_id(&self.token) {
            return Err(CompileError::Syntax(
                "non-keyword identifier expected".to_string(),
            ));
        }
        let names = self.ids()?;

        if self.token != ":" {
            return Err(CompileError::Syntax("\":\" expected".to_string()));
        }

        self.advance()?;
        let data_type = match self.token.as_str() {
            "integer" => StoreType::Integer,
            "boolean" => StoreType::Boolean,
            _ => {
                return Err(CompileError::Type(
                    "illegal type follows \":\"".to_string(),
                ));
            }
        };

        self.advance()?;
        if self.token != ";" {
            return Err(CompileError::Syntax("semicolon expected".to_string()));
        }

        self.table
            .insert(&names, data_type, Mode::Variable, "", Alloc::Yes, 1)?;

        self.advance()?;
        if self.token != "begin" && !token::is_non_key_id(&self.token) {
            return Err(CompileError::Syntax(
                "non-keyword identifier or \"begin\" expected".to_string(),
            ));
        }
        if token::is_non_key_id(&self.token) {
            self.var_stmts()?;
        }
        Ok(())
    }

    /// id_list = id { ',' id }, returned comma-joined.
    fn ids(&mut self) -> Result<String, CompileError> {
        if !token::is_non_key_id(&self.token) {
            return Err(CompileError::Syntax(
                "non-keyword identifier expected".to_string(),
            ));
        }
        let first = self.token.clone();

        self.advance()?;
        if self.token == "," {
            self.advance()?;
            if !token::is_non_key_id(&self.token) {
                return Err(CompileError::Syntax(
                    "non-keyword identifier expected".to_string(),
                ));
            }
            let rest = self.ids()?;
            Ok(format!("{},{}", first, rest))
        } else {
            Ok(first)
        }
    }

    // =======================================================================
    // Statements
    // =======================================================================

    /// block = 'begin' exec_stmts 'end', closed by `.` at the program
    /// level and by `;` when nested.
    fn begin_end_stmt(&mut self, internal: bool) -> Result<(), CompileError> {
        if self.token != "begin" {
            return Err(CompileError::Syntax(
                "keyword \"begin\" expected".to_string(),
            ));
        }
        self.advance()?;

        self.exec_stmts()?;

        if self.token != "end" {
            return Err(CompileError::Syntax("keyword \"end\" expected".to_string()));
        }
        self.advance()?;

        if internal {
            if self.token != ";" {
                return Err(CompileError::Syntax(
                    "semicolon expected after end".to_string(),
                ));
            }
            self.codegen.code(&mut self.table, "end", ";", "")
        } else {
            if self.token != "." {
                return Err(CompileError::Syntax(
                    "\".\" expected after end".to_string(),
                ));
            }
            self.codegen.code(&mut self.table, "end", ".", "")?;
            self.advance()
        }
    }

    fn exec_stmts(&mut self) -> Result<(), CompileError> {
        while self.token != "end" && self.token != "until" && self.token != "do" {
            self.exec_stmt()?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self) -> Result<(), CompileError> {
        if self.token == "read" {
            self.read_stmt()
        } else if self.token == "write" {
            self.write_stmt()
        } else if token::is_non_key_id(&self.token) {
            self.assign_stmt()
        } else if self.token == "if" {
            self.if_stmt()
        } else if self.token == "while" {
            self.while_stmt()
        } else if self.token == "repeat" {
            self.repeat_stmt()
        } else if self.token == ";" {
            // Null statement.
            self.advance()
        } else if self.token == "begin" {
            self.begin_end_stmt(true)
        } else {
            Err(CompileError::Syntax(
                "non-keyword identifier, \"read\", \"write\", \"if\", \"while\", \"repeat\", \
                 \";\", or \"begin\" expected"
                    .to_string(),
            ))
        }
    }

    /// read_stmt = 'read' '(' id_list ')' ';'
    fn read_stmt(&mut self) -> Result<(), CompileError> {
        self.advance()?;
        if self.token != "(" {
            return Err(CompileError::Syntax("'(' expected".to_string()));
        }
        self.advance()?;

        let names = self.ids()?;

        if self.token != ")" {
            return Err(CompileError::Syntax("',' or ')' expected".to_string()));
        }
        self.advance()?;
        if self.token != ";" {
            return Err(CompileError::Syntax("semicolon expected".to_string()));
        }

        self.codegen.code(&mut self.table, "read", &names, "")
    }

    /// write_stmt = 'write' '(' id_list ')' ';'
    fn write_stmt(&mut self) -> Result<(), CompileError> {
        self.advance()?;
        if self.token != "(" {
            return Err(CompileError::Syntax("'(' expected".to_string()));
        }
        self.advance()?;

        let names = self.ids()?;

        if self.token != ")" {
            return Err(CompileError::Syntax("',' or ')' expected".to_string()));
        }
        self.advance()?;
        if self.token != ";" {
            return Err(CompileError::Syntax("semicolon expected".to_string()));
        }

        self.codegen.code(&mut self.table, "write", &names, "")
    }

    /// assign_stmt = ident ':=' expr ';'
    fn assign_stmt(&mut self) -> Result<(), CompileError> {
        let target = self.token.clone();
        self.codegen.push_operand(&mut self.table, &target)?;

        self.advance()?;
        if self.token != ":=" {
            return Err(CompileError::Syntax("\":=\" expected".to_string()));
        }
        self.codegen.push_operator(&self.token);

        self.express()?;

        if self.token != ";" {
            return Err(CompileError::Syntax("semicolon expected".to_string()));
        }

        let operand1 = self.codegen.pop_operand()?;
        let operand2 = self.codegen.pop_operand()?;
        let operator = self.codegen.pop_operator()?;
        self.codegen.code(&mut self.table, &operator, &operand1, &operand2)
    }

    /// if_stmt = 'if' expr 'then' exec_stmt [ 'else' exec_stmt ]
    fn if_stmt(&mut self) -> Result<(), CompileError> {
        self.express()?;

        if self.token != "then" {
            return Err(CompileError::Syntax(
                "\"then\" expected after if statement".to_string(),
            ));
        }

        let predicate = self.codegen.pop_operand()?;
        self.codegen.code(&mut self.table, "then", &predicate, "")?;

        self.advance()?;
        self.exec_stmt()?;
        self.advance()?;

        self.else_pt()
    }

    fn else_pt(&mut self) -> Result<(), CompileError> {
        if self.token == "else" {
            let label = self.codegen.pop_operand()?;
            self.codegen.code(&mut self.table, "else", &label, "")?;

            self.advance()?;
            self.exec_stmt()?;
        }

        let label = self.codegen.pop_operand()?;
        self.codegen.code(&mut self.table, "post_if", &label, "")
    }

    /// while_stmt = 'while' expr 'do' exec_stmt
    fn while_stmt(&mut self) -> Result<(), CompileError> {
        self.codegen.code(&mut self.table, "while", "", "")?;

        self.express()?;

        if self.token != "do" {
            return Err(CompileError::Syntax(
                "\"do\" expected after while".to_string(),
            ));
        }

        let predicate = self.codegen.pop_operand()?;
        self.codegen.code(&mut self.table, "do", &predicate, "")?;

        self.advance()?;
        self.exec_stmt()?;

        let exit_label = self.codegen.pop_operand()?;
        let top_label = self.codegen.pop_operand()?;
        self.codegen
            .code(&mut self.table, "post_while", &exit_label, &top_label)
    }

    /// repeat_stmt = 'repeat' exec_stmts 'until' expr
    fn repeat_stmt(&mut self) -> Result<(), CompileError> {
        self.codegen.code(&mut self.table, "repeat", "", "")?;

        self.advance()?;
        self.exec_stmts()?;

        if self.token != "until" {
            return Err(CompileError::Syntax(
                "\"until\" expected after repeat".to_string(),
            ));
        }

        self.express()?;

        let predicate = self.codegen.pop_operand()?;
        let top_label = self.codegen.pop_operand()?;
        self.codegen
            .code(&mut self.table, "until", &predicate, &top_label)
    }

    // =======================================================================
    // Expressions
    // =======================================================================
    //
    // Three precedence levels, each a pair of methods: the level itself
    // parses one operand of the next-higher level, then its tail keeps
    // reducing while operators of the level are in view.

    fn express(&mut self) -> Result<(), CompileError> {
        self.term()?;
        self.expresses()
    }

    fn expresses(&mut self) -> Result<(), CompileError> {
        if token::is_relational_operator(&self.token) {
            self.codegen.push_operator(&self.token);

            self.term()?;

            let operand1 = self.codegen.pop_operand()?;
            let operand2 = self.codegen.pop_operand()?;
            let operator = self.codegen.pop_operator()?;
            self.codegen
                .code(&mut self.table, &operator, &operand1, &operand2)?;

            self.expresses()?;
        }
        Ok(())
    }

    fn term(&mut self) -> Result<(), CompileError> {
        self.factor()?;
        self.terms()
    }

    fn terms(&mut self) -> Result<(), CompileError> {
        if token::is_add_level_operator(&self.token) {
            self.codegen.push_operator(&self.token);

            self.factor()?;

            let operand1 = self.codegen.pop_operand()?;
            let operand2 = self.codegen.pop_operand()?;
            let operator = self.codegen.pop_operator()?;
            self.codegen
                .code(&mut self.table, &operator, &operand1, &operand2)?;

            self.terms()?;
        }
        Ok(())
    }

    fn factor(&mut self) -> Result<(), CompileError> {
        self.part()?;
        self.factors()
    }

    fn factors(&mut self) -> Result<(), CompileError> {
        if token::is_mul_level_operator(&self.token) {
            self.codegen.push_operator(&self.token);

            self.part()?;

            let operand1 = self.codegen.pop_operand()?;
            let operand2 = self.codegen.pop_operand()?;
            let operator = self.codegen.pop_operator()?;
            self.codegen
                .code(&mut self.table, &operator, &operand1, &operand2)?;

            self.factors()?;
        }
        Ok(())
    }

    /// part = 'not' part' | '+' part' | '-' part' | '(' expr ')'
    ///      | literal | ident
    ///
    /// Unary `+` is a no-op; unary `-` of an integer literal folds into a
    /// signed literal; `not` of a boolean literal folds to the other
    /// literal. Applied to anything else, `-`/`not` emit through the
    /// generator. A token matching no alternative falls through silently;
    /// the stack underflow at the enclosing reduction reports it.
    fn part(&mut self) -> Result<(), CompileError> {
        self.advance()?;

        if self.token == "not" {
            self.advance()?;
            if self.token == "(" {
                self.express()?;
                if self.token != ")" {
                    return Err(CompileError::Syntax("')' expected".to_string()));
                }
                let operand = self.codegen.pop_operand()?;
                self.codegen.code(&mut self.table, "not", &operand, "")?;
            } else if self.token == "false" {
                self.codegen.push_operand(&mut self.table, "true")?;
            } else if self.token == "true" {
                self.codegen.push_operand(&mut self.table, "false")?;
            } else if token::is_non_key_id(&self.token) {
                let operand = self.token.clone();
                self.codegen.code(&mut self.table, "not", &operand, "")?;
            } else {
                return Err(CompileError::Syntax(
                    "illegal symbol follows \"not\"".to_string(),
                ));
            }
            self.advance()
        } else if self.token == "+" {
            self.advance()?;
            if self.token == "(" {
                self.express()?;
                if self.token != ")" {
                    return Err(CompileError::Syntax("')' expected".to_string()));
                }
            } else if token::is_integer_literal(&self.token)
                || token::is_non_key_id(&self.token)
            {
                let operand = self.token.clone();
                self.codegen.push_operand(&mut self.table, &operand)?;
            } else {
                return Err(CompileError::Syntax(
                    "illegal symbol follows '+'".to_string(),
                ));
            }
            self.advance()
        } else if self.token == "-" {
            self.advance()?;
            if self.token == "(" {
                self.express()?;
                if self.token != ")" {
                    return Err(CompileError::Syntax("')' expected".to_string()));
                }
                let operand = self.codegen.pop_operand()?;
                self.codegen.code(&mut self.table, "neg", &operand, "")?;
            } else if token::is_integer_literal(&self.token) {
                let operand = format!("-{}", self.token);
                self.codegen.push_operand(&mut self.table, &operand)?;
            } else if token::is_non_key_id(&self.token) {
                let operand = self.token.clone();
                self.codegen.code(&mut self.table, "neg", &operand, "")?;
            } else {
                return Err(CompileError::Syntax(
                    "illegal symbol follows '-'".to_string(),
                ));
            }
            self.advance()
        } else if self.token == "(" {
            self.express()?;
            if self.token != ")" {
                return Err(CompileError::Syntax("')' expected".to_string()));
            }
            self.advance()
        } else if token::is_integer_literal(&self.token)
            || token::is_boolean_literal(&self.token)
            || token::is_non_key_id(&self.token)
        {
            let operand = self.token.clone();
            self.codegen.push_operand(&mut self.table, &operand)?;
            self.advance()
        } else {
            Ok(())
        }
    }
}
