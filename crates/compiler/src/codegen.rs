//! Object-text generation.
//!
//! `CodeGen` owns everything the single pass mutates while translating
//! expressions and statements: the object-text buffer, the operand and
//! operator stacks, the temporary and label counters, and the accumulator
//! shadow. The parser calls [`CodeGen::code`] at every reduction point;
//! `code` dispatches on the operator lexeme to one emit routine per
//! operation.
//!
//! # The accumulator shadow
//!
//! The target machine has a single A register. `a_register` holds the
//! external name of whatever the most recently emitted instruction left
//! there, or is empty. Every binary emitter first reconciles the shadow:
//! a resident temporary that is not one of the incoming operands is
//! spilled (`STA T<k>`, which also marks the temp for storage in the data
//! section); a resident non-operand name is simply forgotten. A `LDA` is
//! only emitted when the needed operand is not already resident. Branches
//! and labels invalidate the register, so every control-flow emitter
//! clears the shadow.
//!
//! # Temporaries
//!
//! Temporaries behave like a stack: `get_temp` bumps `current_temp_no` and
//! reuses the table entry when one with that number already exists;
//! `free_temp` decrements. Only spilled temporaries (alloc = Yes) receive
//! a `BSS` slot at program end.

use std::fmt::Write as _;

use crate::error::CompileError;
use crate::symbol::{Alloc, Mode, StoreType, SymbolTable};
use crate::token;

#[derive(Debug)]
pub struct CodeGen {
    output: String,
    operand_stack: Vec<String>,
    operator_stack: Vec<String>,
    /// External name resident in the A register; empty when unknown.
    a_register: String,
    current_temp_no: i32,
    max_temp_no: i32,
    current_label_no: i32,
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGen {
    pub fn new() -> Self {
        CodeGen {
            output: String::new(),
            operand_stack: Vec::new(),
            operator_stack: Vec::new(),
            a_register: String::new(),
            current_temp_no: -1,
            max_temp_no: -1,
            current_label_no: -1,
        }
    }

    /// Object text emitted so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    // =======================================================================
    // Operand/operator stacks
    // =======================================================================

    pub fn push_operator(&mut self, name: &str) {
        self.operator_stack.push(name.to_string());
    }

    pub fn pop_operator(&mut self) -> Result<String, CompileError> {
        self.operator_stack
            .pop()
            .ok_or_else(|| CompileError::Syntax("operator stack underflow".to_string()))
    }

    /// Push a name onto the operand stack.
    ///
    /// A numeric or boolean literal is interned as a constant on first
    /// sight; `true`/`false` are only interned when no boolean constant
    /// with the matching value exists yet, so at most one of each is kept.
    pub fn push_operand(
        &mut self,
        table: &mut SymbolTable,
        name: &str,
    ) -> Result<(), CompileError> {
        if (token::is_boolean_literal(name) || token::is_integer_literal(name))
            && !table.contains(name)
        {
            let should_intern = match name {
                "true" => table.find_index_of_true().is_none(),
                "false" => table.find_index_of_false().is_none(),
                _ => true,
            };
            if should_intern {
                let data_type = table.which_type(name)?;
                table.insert(name, data_type, Mode::Constant, name, Alloc::Yes, 1)?;
            }
        }
        self.operand_stack.push(name.to_string());
        Ok(())
    }

    pub fn pop_operand(&mut self) -> Result<String, CompileError> {
        self.operand_stack
            .pop()
            .ok_or_else(|| CompileError::Syntax("operand stack underflow".to_string()))
    }

    // =======================================================================
    // Temporaries and labels
    // =======================================================================

    /// Hand out the next temporary, creating its table entry the first
    /// time that temp number is reached.
    pub fn get_temp(&mut self, table: &mut SymbolTable) -> Result<String, CompileError> {
        self.current_temp_no += 1;
        let temp = format!("T{}", self.current_temp_no);
        if self.current_temp_no > self.max_temp_no {
            table.insert(&temp, StoreType::Unknown, Mode::Variable, "", Alloc::No, 1)?;
            self.max_temp_no += 1;
        }
        Ok(temp)
    }

    /// Release the most recent temporary.
    pub fn free_temp(&mut self) -> Result<(), CompileError> {
        self.current_temp_no -= 1;
        if self.current_temp_no < -1 {
            return Err(CompileError::Internal(
                "compiler error, currentTempNo should be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Hand out the next label. Labels are never reused.
    pub fn get_label(&mut self) -> String {
        self.current_label_no += 1;
        format!("L{}", self.current_label_no)
    }

    // =======================================================================
    // Dispatcher
    // =======================================================================

    /// Emit the code for one operator applied to up to two operands.
    ///
    /// `operand1` is the top of the operand stack at the reduction point
    /// (the right operand of a binary operator), `operand2` the one below
    /// it. Pass empty strings for the operands a pseudo-operator does not
    /// take.
    pub fn code(
        &mut self,
        table: &mut SymbolTable,
        operator: &str,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        match operator {
            "program" => self.emit_prologue(table),
            "end" => match operand1 {
                "." => self.emit_epilogue(table),
                ";" => Ok(()),
                _ => Err(CompileError::Syntax(
                    "illegal character follows end".to_string(),
                )),
            },
            "read" => self.emit_read(table, operand1),
            "write" => self.emit_write(table, operand1),
            "+" => self.emit_addition(table, operand1, operand2),
            "-" => self.emit_subtraction(table, operand1, operand2),
            "neg" => self.emit_negation(table, operand1),
            "not" => self.emit_not(table, operand1),
            "*" => self.emit_multiplication(table, operand1, operand2),
            "div" => self.emit_division(table, operand1, operand2),
            "mod" => self.emit_modulus(table, operand1, operand2),
            "and" => {
                let operand1 = resolve_boolean_literal(table, operand1)?;
                let operand2 = resolve_boolean_literal(table, operand2)?;
                self.emit_and(table, &operand1, &operand2)
            }
            "or" => {
                let operand1 = resolve_boolean_literal(table, operand1)?;
                let operand2 = resolve_boolean_literal(table, operand2)?;
                self.emit_or(table, &operand1, &operand2)
            }
            "=" => self.emit_equals(table, operand1, operand2),
            "<>" => self.emit_not_equals(table, operand1, operand2),
            "<=" => self.emit_less_than_or_equal(table, operand1, operand2),
            ">=" => self.emit_greater_than_or_equal(table, operand1, operand2),
            "<" => self.emit_less_than(table, operand1, operand2),
            ">" => self.emit_greater_than(table, operand1, operand2),
            ":=" => {
                let operand1 = resolve_boolean_literal(table, operand1)?;
                self.emit_assign(table, &operand1, operand2)
            }
            "then" => {
                let operand1 = resolve_boolean_literal(table, operand1)?;
                self.emit_then(table, &operand1)
            }
            "else" => self.emit_else(table, operand1),
            "post_if" => self.emit_post_if(operand1),
            "while" => self.emit_while(table),
            "do" => {
                let operand1 = resolve_boolean_literal(table, operand1)?;
                self.emit_do(table, &operand1)
            }
            "post_while" => self.emit_post_while(operand1, operand2),
            "repeat" => self.emit_repeat(table),
            "until" => {
                let operand1 = resolve_boolean_literal(table, operand1)?;
                self.emit_until(table, &operand1, operand2)
            }
            _ => Err(CompileError::Internal("undefined operation".to_string())),
        }
    }

    // =======================================================================
    // Program framing
    // =======================================================================

    fn emit_prologue(&mut self, table: &SymbolTable) -> Result<(), CompileError> {
        writeln!(
            self.output,
            "STRT  NOP          {} - {}",
            table.get(0).internal_name,
            crate::SIGNATURE
        )?;
        Ok(())
    }

    /// `HLT`, then one data-section line per allocated symbol in insertion
    /// order, then the `END STRT` terminator.
    fn emit_epilogue(&mut self, table: &SymbolTable) -> Result<(), CompileError> {
        writeln!(self.output, "      HLT          ")?;

        for entry in table.entries() {
            if entry.alloc != Alloc::Yes {
                continue;
            }
            match entry.mode {
                Mode::Constant => {
                    write!(self.output, "{:<4}  DEC ", entry.internal_name)?;
                    if let Some(magnitude) = entry.value.strip_prefix('-') {
                        write!(self.output, "-{:0>3}", magnitude)?;
                    } else {
                        write!(self.output, "{:0>4}", entry.value)?;
                    }
                    writeln!(self.output, "     {}", entry.external_name)?;
                }
                Mode::Variable => {
                    writeln!(
                        self.output,
                        "{:<4}  BSS 0001     {}",
                        entry.internal_name, entry.external_name
                    )?;
                }
            }
        }

        writeln!(self.output, "      END STRT     ")?;
        Ok(())
    }

    // =======================================================================
    // I/O statements
    // =======================================================================

    fn emit_read(&mut self, table: &SymbolTable, names: &str) -> Result<(), CompileError> {
        for name in names.split(',') {
            let index = table.find_index(name)?;
            if table.get(index).mode != Mode::Variable {
                return Err(CompileError::Type(
                    "can't change constant's value".to_string(),
                ));
            }
            writeln!(
                self.output,
                "      RDI {:<9}read({})",
                table.get(index).internal_name,
                table.get(index).external_name
            )?;
        }
        Ok(())
    }

    fn emit_write(&mut self, table: &SymbolTable, names: &str) -> Result<(), CompileError> {
        for name in names.split(',') {
            let index = table.find_index(name)?;
            writeln!(
                self.output,
                "      PRI {}       write({})",
                table.get(index).internal_name,
                table.get(index).external_name
            )?;
        }
        Ok(())
    }

    // =======================================================================
    // Arithmetic
    // =======================================================================

    fn emit_addition(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        require_integers(table, &[i1, i2])?;

        self.reconcile_a_register(table, &[operand1, operand2], &[operand1, operand2])?;

        if self.a_register == operand1 {
            writeln!(
                self.output,
                "      IAD {:<9}{} + {}",
                table.get(i2).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else if self.a_register == operand2 {
            writeln!(
                self.output,
                "      IAD {:<9}{} + {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
            writeln!(
                self.output,
                "      IAD {:<9}{} + {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        }

        self.allocate_result(table, &[operand1, operand2], StoreType::Integer)
    }

    fn emit_subtraction(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        require_integers(table, &[i1, i2])?;

        // Subtraction is not commutative; only left-operand residency can
        // save the load.
        self.reconcile_a_register(table, &[operand2], &[operand1, operand2])?;

        if self.a_register != operand2 {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
        }
        writeln!(
            self.output,
            "      ISB {:<9}{} - {}",
            table.get(i1).internal_name,
            table.get(i2).external_name,
            table.get(i1).external_name
        )?;

        self.allocate_result(table, &[operand1, operand2], StoreType::Integer)
    }

    /// Unary minus is lowered as `ZERO - operand`.
    fn emit_negation(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        require_integers(table, &[i1])?;

        self.reconcile_a_register(table, &[], &[operand1])?;

        writeln!(self.output, "      LDA {:<9}", "ZERO")?;
        if !table.contains("ZERO") {
            table.insert("ZERO", StoreType::Integer, Mode::Constant, "0", Alloc::Yes, 1)?;
        }
        writeln!(
            self.output,
            "      ISB {:<9}-{}",
            table.get(i1).internal_name,
            table.get(i1).external_name
        )?;

        self.allocate_result(table, &[operand1], StoreType::Integer)
    }

    fn emit_multiplication(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        require_integers(table, &[i1, i2])?;

        self.reconcile_a_register(table, &[operand1, operand2], &[operand1, operand2])?;

        if self.a_register == operand1 {
            writeln!(
                self.output,
                "      IMU {:<9}{} * {}",
                table.get(i2).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else if self.a_register == operand2 {
            writeln!(
                self.output,
                "      IMU {:<9}{} * {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
            writeln!(
                self.output,
                "      IMU {:<9}{} * {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        }

        self.allocate_result(table, &[operand1, operand2], StoreType::Integer)
    }

    fn emit_division(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        require_integers(table, &[i1, i2])?;

        self.reconcile_a_register(table, &[operand2], &[operand2])?;

        if self.a_register != operand2 {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
        }
        writeln!(
            self.output,
            "      IDV {:<9}{} div {}",
            table.get(i1).internal_name,
            table.get(i2).external_name,
            table.get(i1).external_name
        )?;

        self.allocate_result(table, &[operand1, operand2], StoreType::Integer)
    }

    /// `mod` divides and then salvages the remainder from the Q register:
    /// the result temp is always memory-backed.
    fn emit_modulus(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        require_integers(table, &[i1, i2])?;

        self.reconcile_a_register(table, &[operand2], &[operand2])?;

        if self.a_register != operand2 {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
        }
        writeln!(
            self.output,
            "      IDV {:<9}{} mod {}",
            table.get(i1).internal_name,
            table.get(i2).external_name,
            table.get(i1).external_name
        )?;

        for operand in [operand1, operand2] {
            if operand.starts_with('T') {
                self.free_temp()?;
            }
        }
        let temp = self.get_temp(table)?;
        let index = table.find_index(&temp)?;
        table.get_mut(index).data_type = StoreType::Integer;
        table.get_mut(index).alloc = Alloc::Yes;
        writeln!(
            self.output,
            "      STQ {:<9}store remainder in memory",
            table.get(index).internal_name
        )?;
        writeln!(
            self.output,
            "      LDA {:<9}load remainder from memory",
            table.get(index).internal_name
        )?;
        self.a_register = temp.clone();
        self.operand_stack.push(temp);
        Ok(())
    }

    // =======================================================================
    // Boolean operators
    // =======================================================================

    /// `and` multiplies the two flags.
    fn emit_and(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        if table.get(i1).data_type != StoreType::Boolean
            || table.get(i2).data_type != StoreType::Boolean
        {
            return Err(CompileError::Type(
                "operator and requires boolean operands".to_string(),
            ));
        }

        self.reconcile_a_register(table, &[operand1, operand2], &[operand1, operand2])?;

        if self.a_register == operand1 {
            writeln!(
                self.output,
                "      IMU {:<9}{} and {}",
                table.get(i2).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else if self.a_register == operand2 {
            writeln!(
                self.output,
                "      IMU {:<9}{} and {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
            writeln!(
                self.output,
                "      IMU {:<9}{} and {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        }

        self.allocate_result(table, &[operand1, operand2], StoreType::Boolean)
    }

    /// `or` adds the flags, then normalizes any non-zero sum to true.
    fn emit_or(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        if table.get(i1).data_type != StoreType::Boolean
            || table.get(i2).data_type != StoreType::Boolean
        {
            return Err(CompileError::Type(
                "operator or requires boolean operands".to_string(),
            ));
        }

        self.reconcile_a_register(table, &[operand1, operand2], &[operand1, operand2])?;

        if self.a_register == operand1 {
            writeln!(
                self.output,
                "      IAD {:<9}{} or {}",
                table.get(i2).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else if self.a_register == operand2 {
            writeln!(
                self.output,
                "      IAD {:<9}{} or {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
            writeln!(
                self.output,
                "      IAD {:<9}{} or {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        }

        let label = self.get_label();
        writeln!(self.output, "      AZJ {:<4}+1   ", label)?;
        writeln!(self.output, "{:<6}LDA {:<9}", label, "TRUE")?;
        if !table.contains("TRUE") {
            table.insert("TRUE", StoreType::Boolean, Mode::Constant, "1", Alloc::Yes, 1)?;
        }

        self.allocate_result(table, &[operand1, operand2], StoreType::Boolean)
    }

    fn emit_not(&mut self, table: &mut SymbolTable, operand1: &str) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        if table.get(i1).data_type != StoreType::Boolean {
            return Err(CompileError::Type("illegal type".to_string()));
        }

        self.reconcile_a_register(table, &[operand1], &[operand1])?;

        if self.a_register != operand1 {
            writeln!(self.output, "      LDA {:<9}", table.get(i1).internal_name)?;
        }

        let label = self.get_label();
        writeln!(
            self.output,
            "      AZJ {:<9}not {}",
            label,
            table.get(i1).external_name
        )?;
        writeln!(self.output, "      LDA {:<9}", "FALS")?;
        if !table.contains("FALSE") {
            table.insert("FALSE", StoreType::Boolean, Mode::Constant, "0", Alloc::Yes, 1)?;
        }
        writeln!(self.output, "      UNJ {:<4}+1   ", label)?;
        writeln!(self.output, "{:<6}LDA {:<9}", label, "TRUE")?;
        if !table.contains("TRUE") {
            table.insert("TRUE", StoreType::Boolean, Mode::Constant, "1", Alloc::Yes, 1)?;
        }

        self.allocate_result(table, &[operand1], StoreType::Boolean)
    }

    // =======================================================================
    // Comparisons
    // =======================================================================
    //
    // All comparisons subtract and branch. TRUE/FALS are interned lazily,
    // right after the first instruction that names them.

    fn emit_equals(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        if table.get(i1).data_type != table.get(i2).data_type {
            return Err(CompileError::Type("incompatible types".to_string()));
        }

        self.reconcile_a_register(table, &[operand1, operand2], &[operand1, operand2])?;

        if self.a_register == operand1 {
            writeln!(
                self.output,
                "      ISB {:<9}{} = {}",
                table.get(i2).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else if self.a_register == operand2 {
            writeln!(
                self.output,
                "      ISB {:<9}{} = {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
            writeln!(
                self.output,
                "      ISB {:<9}{} = {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        }

        let label = self.get_label();
        writeln!(self.output, "      AZJ {:<4}     ", label)?;
        writeln!(self.output, "      LDA {:<9}", "FALS")?;
        if !table.contains("FALSE") {
            table.insert("FALSE", StoreType::Boolean, Mode::Constant, "0", Alloc::Yes, 1)?;
        }
        writeln!(self.output, "      UNJ {:<4}+1   ", label)?;
        writeln!(self.output, "{:<6}LDA {:<9}", label, "TRUE")?;
        if !table.contains("TRUE") {
            table.insert("TRUE", StoreType::Boolean, Mode::Constant, "1", Alloc::Yes, 1)?;
        }

        self.allocate_result(table, &[operand1, operand2], StoreType::Boolean)
    }

    /// `<>` has no false arm: a non-zero difference simply falls through
    /// with a non-zero accumulator, which downstream consumers treat as
    /// true. Contractual, not an oversight.
    fn emit_not_equals(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        if table.get(i1).data_type != table.get(i2).data_type {
            return Err(CompileError::Type("incompatible types".to_string()));
        }

        self.reconcile_a_register(table, &[operand1, operand2], &[operand1, operand2])?;

        if self.a_register == operand1 {
            writeln!(
                self.output,
                "      ISB {:<9}{} <> {}",
                table.get(i2).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else if self.a_register == operand2 {
            writeln!(
                self.output,
                "      ISB {:<9}{} <> {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        } else {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
            writeln!(
                self.output,
                "      ISB {:<9}{} <> {}",
                table.get(i1).internal_name,
                table.get(i2).external_name,
                table.get(i1).external_name
            )?;
        }

        let label = self.get_label();
        writeln!(self.output, "      AZJ {:<4}+1   ", label)?;
        writeln!(self.output, "{:<6}LDA {:<9}", label, "TRUE")?;
        if !table.contains("TRUE") {
            table.insert("TRUE", StoreType::Boolean, Mode::Constant, "1", Alloc::Yes, 1)?;
        }

        self.allocate_result(table, &[operand1, operand2], StoreType::Boolean)
    }

    fn emit_less_than_or_equal(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        require_integers(table, &[i1, i2])?;

        self.reconcile_a_register(table, &[operand2], &[operand1, operand2])?;

        if self.a_register != operand2 {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
        }
        writeln!(
            self.output,
            "      ISB {:<9}{} <= {}",
            table.get(i1).internal_name,
            table.get(i2).external_name,
            table.get(i1).external_name
        )?;

        let label = self.get_label();
        writeln!(self.output, "      AMJ {:<4}     ", label)?;
        writeln!(self.output, "      AZJ {:<4}     ", label)?;
        writeln!(self.output, "      LDA {:<9}", "FALS")?;
        if !table.contains("FALSE") {
            table.insert("FALSE", StoreType::Boolean, Mode::Constant, "0", Alloc::Yes, 1)?;
        }
        writeln!(self.output, "      UNJ {:<4}+1   ", label)?;
        writeln!(self.output, "{:<6}LDA {:<9}", label, "TRUE")?;
        if !table.contains("TRUE") {
            table.insert("TRUE", StoreType::Boolean, Mode::Constant, "1", Alloc::Yes, 1)?;
        }

        self.allocate_result(table, &[operand1, operand2], StoreType::Boolean)
    }

    /// The parameter names are swapped relative to the other comparison
    /// emitters so the dispatcher can pass operands in textual order while
    /// the subtraction still computes left minus right.
    fn emit_greater_than_or_equal(
        &mut self,
        table: &mut SymbolTable,
        operand2: &str,
        operand1: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        require_integers(table, &[i1, i2])?;

        self.reconcile_a_register(table, &[operand2], &[operand1, operand2])?;

        if self.a_register != operand1 {
            writeln!(self.output, "      LDA {:<9}", table.get(i1).internal_name)?;
        }
        writeln!(
            self.output,
            "      ISB {:<9}{} >= {}",
            table.get(i2).internal_name,
            table.get(i1).external_name,
            table.get(i2).external_name
        )?;

        let label = self.get_label();
        writeln!(self.output, "      AMJ {:<4}     ", label)?;
        writeln!(self.output, "      LDA {:<9}", "TRUE")?;
        if !table.contains("TRUE") {
            table.insert("TRUE", StoreType::Boolean, Mode::Constant, "1", Alloc::Yes, 1)?;
        }
        writeln!(self.output, "      UNJ {:<4}+1   ", label)?;
        writeln!(self.output, "{:<6}LDA {:<9}", label, "FALS")?;
        if !table.contains("FALSE") {
            table.insert("FALSE", StoreType::Boolean, Mode::Constant, "0", Alloc::Yes, 1)?;
        }

        self.allocate_result(table, &[operand1, operand2], StoreType::Boolean)
    }

    fn emit_less_than(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        require_integers(table, &[i1, i2])?;

        self.reconcile_a_register(table, &[operand2], &[operand1, operand2])?;

        if self.a_register != operand2 {
            writeln!(self.output, "      LDA {:<9}", table.get(i2).internal_name)?;
        }
        writeln!(
            self.output,
            "      ISB {:<9}{} < {}",
            table.get(i1).internal_name,
            table.get(i2).external_name,
            table.get(i1).external_name
        )?;

        let label = self.get_label();
        writeln!(self.output, "      AMJ {:<4}     ", label)?;
        writeln!(self.output, "      LDA {:<9}", "FALS")?;
        if !table.contains("FALSE") {
            table.insert("FALSE", StoreType::Boolean, Mode::Constant, "0", Alloc::Yes, 1)?;
        }
        writeln!(self.output, "      UNJ {:<4}+1   ", label)?;
        writeln!(self.output, "{:<6}LDA {:<9}", label, "TRUE")?;
        if !table.contains("TRUE") {
            table.insert("TRUE", StoreType::Boolean, Mode::Constant, "1", Alloc::Yes, 1)?;
        }

        self.allocate_result(table, &[operand1, operand2], StoreType::Boolean)
    }

    /// Swapped parameter names; see [`Self::emit_greater_than_or_equal`].
    fn emit_greater_than(
        &mut self,
        table: &mut SymbolTable,
        operand2: &str,
        operand1: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        require_integers(table, &[i1, i2])?;

        self.reconcile_a_register(table, &[operand2], &[operand1, operand2])?;

        if self.a_register != operand1 {
            writeln!(self.output, "      LDA {:<9}", table.get(i1).internal_name)?;
        }
        writeln!(
            self.output,
            "      ISB {:<9}{} > {}",
            table.get(i2).internal_name,
            table.get(i1).external_name,
            table.get(i2).external_name
        )?;

        let label = self.get_label();
        writeln!(self.output, "      AMJ {:<4}     ", label)?;
        writeln!(self.output, "      AZJ {:<4}     ", label)?;
        writeln!(self.output, "      LDA {:<9}", "TRUE")?;
        if !table.contains("TRUE") {
            table.insert("TRUE", StoreType::Boolean, Mode::Constant, "1", Alloc::Yes, 1)?;
        }
        writeln!(self.output, "      UNJ {:<4}+1   ", label)?;
        writeln!(self.output, "{:<6}LDA {:<9}", label, "FALS")?;
        if !table.contains("FALSE") {
            table.insert("FALSE", StoreType::Boolean, Mode::Constant, "0", Alloc::Yes, 1)?;
        }

        self.allocate_result(table, &[operand1, operand2], StoreType::Boolean)
    }

    // =======================================================================
    // Assignment
    // =======================================================================

    fn emit_assign(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let i1 = table.find_index(operand1)?;
        let i2 = table.find_index(operand2)?;
        if table.get(i1).data_type != table.get(i2).data_type {
            return Err(CompileError::Type("incompatible types".to_string()));
        }
        if table.get(i2).mode != Mode::Variable {
            return Err(CompileError::Type(
                "symbol on left-hand side of assignment must have a storage mode of VARIABLE"
                    .to_string(),
            ));
        }
        // Self-assignment needs no code.
        if table.get(i1).external_name == table.get(i2).external_name {
            return Ok(());
        }

        if table.get(i1).external_name != self.a_register {
            writeln!(self.output, "      LDA {:<9}", table.get(i1).internal_name)?;
        }
        writeln!(
            self.output,
            "      STA {:<9}{} := {}",
            table.get(i2).internal_name,
            table.get(i2).external_name,
            table.get(i1).external_name
        )?;

        self.a_register = operand2.to_string();

        if table.get(i1).internal_name.starts_with('T') && table.get(i1).internal_name != "TRUE" {
            self.free_temp()?;
        }
        Ok(())
    }

    // =======================================================================
    // Control flow
    // =======================================================================
    //
    // Each construct communicates through the operand stack: the emitters
    // that open a region push the label that closes it, and the emitters
    // that close it pop. A branch target invalidates the accumulator, so
    // every routine here ends by clearing the shadow.

    fn emit_then(&mut self, table: &mut SymbolTable, operand: &str) -> Result<(), CompileError> {
        let index = table.find_index(operand)?;
        let label = self.get_label();

        if table.get(index).data_type != StoreType::Boolean {
            return Err(CompileError::Type(
                "predicate must be boolean valued".to_string(),
            ));
        }

        if (!operand.starts_with('T') && token::is_non_key_id(operand))
            || operand == "true"
            || operand == "false"
        {
            writeln!(self.output, "      LDA {:<9}", table.get(index).internal_name)?;
        }
        writeln!(
            self.output,
            "      AZJ {:<4}     if false jump to {}",
            label, label
        )?;

        self.push_operand(table, &label)?;

        if operand.starts_with('T') {
            self.free_temp()?;
        }
        self.a_register.clear();
        Ok(())
    }

    fn emit_else(&mut self, table: &mut SymbolTable, operand: &str) -> Result<(), CompileError> {
        let label = self.get_label();

        writeln!(self.output, "      UNJ {:<4}     jump to end if", label)?;
        writeln!(self.output, "{:<6}NOP          else", operand)?;

        self.push_operand(table, &label)?;
        self.a_register.clear();
        Ok(())
    }

    fn emit_post_if(&mut self, operand: &str) -> Result<(), CompileError> {
        writeln!(self.output, "{:<6}NOP          end if", operand)?;
        self.a_register.clear();
        Ok(())
    }

    fn emit_while(&mut self, table: &mut SymbolTable) -> Result<(), CompileError> {
        let label = self.get_label();
        writeln!(self.output, "{:<6}NOP          while", label)?;
        self.push_operand(table, &label)?;
        self.a_register.clear();
        Ok(())
    }

    fn emit_do(&mut self, table: &mut SymbolTable, operand: &str) -> Result<(), CompileError> {
        let index = table.find_index(operand)?;
        let label = self.get_label();

        if table.get(index).data_type != StoreType::Boolean {
            return Err(CompileError::Type(
                "predicate must be boolean valued".to_string(),
            ));
        }

        if (!operand.starts_with('T') && token::is_non_key_id(operand))
            || operand == "true"
            || operand == "false"
        {
            writeln!(self.output, "      LDA {:<9}", table.get(index).internal_name)?;
        }
        writeln!(self.output, "      AZJ {:<4}     do", label)?;

        self.push_operand(table, &label)?;

        if operand.starts_with('T') {
            self.free_temp()?;
        }
        self.a_register.clear();
        Ok(())
    }

    /// `operand1` is the loop-exit label, `operand2` the loop-top label.
    fn emit_post_while(&mut self, operand1: &str, operand2: &str) -> Result<(), CompileError> {
        writeln!(self.output, "      UNJ {:<4}     end while", operand2)?;
        writeln!(self.output, "{:<6}NOP          ", operand1)?;
        self.a_register.clear();
        Ok(())
    }

    fn emit_repeat(&mut self, table: &mut SymbolTable) -> Result<(), CompileError> {
        let label = self.get_label();
        writeln!(self.output, "{:<6}NOP          repeat", label)?;
        self.push_operand(table, &label)?;
        self.a_register.clear();
        Ok(())
    }

    /// `operand1` is the predicate, `operand2` the loop-top label. The
    /// loop re-enters while the predicate is false (zero): a true
    /// predicate falls through and exits.
    fn emit_until(
        &mut self,
        table: &mut SymbolTable,
        operand1: &str,
        operand2: &str,
    ) -> Result<(), CompileError> {
        let index = table.find_index(operand1)?;

        if table.get(index).data_type != StoreType::Boolean {
            return Err(CompileError::Type(
                "predicate must be boolean valued".to_string(),
            ));
        }

        if (!operand1.starts_with('T') && token::is_non_key_id(operand1))
            || operand1 == "true"
            || operand1 == "false"
        {
            writeln!(self.output, "      LDA {:<9}", table.get(index).internal_name)?;
        }
        writeln!(self.output, "      AZJ {:<4}     until", operand2)?;

        if operand1.starts_with('T') {
            self.free_temp()?;
        }
        self.a_register.clear();
        Ok(())
    }

    // =======================================================================
    // Shared tails
    // =======================================================================

    /// Reconcile the accumulator shadow before a value-producing emitter
    /// writes any instruction.
    ///
    /// A resident temporary not in `keep_spill` is stored back to memory
    /// and marked for allocation; otherwise a resident name not in
    /// `keep_clear` is forgotten. The two sets differ per emitter because
    /// only some operand positions can reuse the register.
    fn reconcile_a_register(
        &mut self,
        table: &mut SymbolTable,
        keep_spill: &[&str],
        keep_clear: &[&str],
    ) -> Result<(), CompileError> {
        if self.a_register.starts_with('T') && !keep_spill.contains(&self.a_register.as_str()) {
            writeln!(self.output, "      STA {:<9}deassign AReg", self.a_register)?;
            let index = table.find_index(&self.a_register)?;
            table.get_mut(index).alloc = Alloc::Yes;
            self.a_register.clear();
        } else if !keep_clear.contains(&self.a_register.as_str()) {
            self.a_register.clear();
        }
        Ok(())
    }

    /// Free consumed temporaries, mint the result temp, type it, make it
    /// the accumulator occupant, and push it for the next reduction.
    fn allocate_result(
        &mut self,
        table: &mut SymbolTable,
        consumed: &[&str],
        data_type: StoreType,
    ) -> Result<(), CompileError> {
        for operand in consumed {
            if operand.starts_with('T') {
                self.free_temp()?;
            }
        }
        let temp = self.get_temp(table)?;
        let index = table.find_index(&temp)?;
        table.get_mut(index).data_type = data_type;
        self.a_register = temp.clone();
        self.operand_stack.push(temp);
        Ok(())
    }
}

/// Rewrite a literal `true`/`false` operand to the external name of an
/// interned boolean constant, creating the lowercase sentinel entry on
/// first use. Non-literal operands pass through untouched.
fn resolve_boolean_literal(
    table: &mut SymbolTable,
    operand: &str,
) -> Result<String, CompileError> {
    match operand {
        "true" => match table.find_index_of_true() {
            Some(index) => Ok(table.get(index).external_name.clone()),
            None => {
                table.insert(
                    "LOWERCASETRUE",
                    StoreType::Boolean,
                    Mode::Constant,
                    "1",
                    Alloc::Yes,
                    1,
                )?;
                Ok("true".to_string())
            }
        },
        "false" => match table.find_index_of_false() {
            Some(index) => Ok(table.get(index).external_name.clone()),
            None => {
                table.insert(
                    "LOWERCASEFALSE",
                    StoreType::Boolean,
                    Mode::Constant,
                    "0",
                    Alloc::Yes,
                    1,
                )?;
                Ok("false".to_string())
            }
        },
        _ => Ok(operand.to_string()),
    }
}

fn require_integers(table: &SymbolTable, indices: &[usize]) -> Result<(), CompileError> {
    for &index in indices {
        if table.get(index).data_type != StoreType::Integer {
            return Err(CompileError::Type("illegal type".to_string()));
        }
    }
    Ok(())
}
