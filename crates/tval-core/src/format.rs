use crate::block::{BasicBlock, Terminator};
use crate::function::Function;
use crate::global::GlobalVariable;
use crate::instructions::Instruction;
use crate::module::Module;
use crate::values::ValueId;
use std::fmt;

pub fn format_module(module: &Module) -> String {
    ModuleDisplay(module).to_string()
}

pub fn format_function(function: &Function) -> String {
    FunctionDisplay(function).to_string()
}

struct ModuleDisplay<'a>(&'a Module);

impl fmt::Display for ModuleDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = self.0;
        writeln!(f, "; module {} ({})", module.name, module.stage())?;
        if let Some(source) = &module.context.source_file {
            writeln!(f, "; source {}", source)?;
        }
        for (name, ty) in module.types.iter() {
            writeln!(f, "typealias {} = {}", name, ty)?;
        }
        for global in module.globals.values() {
            write_global(f, global)?;
        }
        for function in module.functions.values() {
            writeln!(f)?;
            write!(f, "{}", FunctionDisplay(function))?;
        }
        Ok(())
    }
}

fn write_global(f: &mut fmt::Formatter<'_>, global: &GlobalVariable) -> fmt::Result {
    write!(f, "global {} @{} : {}", global.linkage, global.name, global.ty)?;
    if let Some(init) = &global.initializer {
        write!(f, " = {{")?;
        for inst in &init.instructions {
            write!(f, " {};", inst)?;
        }
        write!(f, " {} }}", init.result)?;
    }
    writeln!(f)
}

struct FunctionDisplay<'a>(&'a Function);

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let function = self.0;
        write!(f, "func {} @{} : {}", function.linkage, function.name, function.ty)?;
        let Some(body) = &function.body else {
            return writeln!(f);
        };
        writeln!(f, " {{")?;
        for block in body.blocks.values() {
            write!(f, "{}", block)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if !self.params.is_empty() {
            write!(f, "(")?;
            for (i, param) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} : {}", param.value, param.ty)?;
            }
            write!(f, ")")?;
        }
        writeln!(f, ":")?;
        for inst in &self.instructions {
            writeln!(f, "  {}", inst)?;
        }
        writeln!(f, "  {}", self.terminator)
    }
}

struct Args<'a>(&'a [ValueId]);

impl fmt::Display for Args<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::IntegerLiteral { result, ty, value } => {
                write!(f, "{} = integer_literal ${}, {}", result, ty, value)
            }
            Instruction::BoolLiteral { result, value } => {
                write!(f, "{} = bool_literal {}", result, value)
            }
            Instruction::Binary {
                result,
                op,
                ty,
                left,
                right,
            } => write!(f, "{} = {} ${} {}, {}", result, op, ty, left, right),
            Instruction::CheckedArith {
                result,
                op,
                signed,
                ty,
                left,
                right,
            } => write!(
                f,
                "{} = checked_{}{} ${} {}, {}",
                result,
                if *signed { "s" } else { "u" },
                op,
                ty,
                left,
                right
            ),
            Instruction::ArithWithOverflow {
                result,
                overflow,
                op,
                signed,
                ty,
                left,
                right,
            } => write!(
                f,
                "({}, {}) = {}{}_with_overflow ${} {}, {}",
                result,
                overflow,
                if *signed { "s" } else { "u" },
                op,
                ty,
                left,
                right
            ),
            Instruction::Compare {
                result,
                op,
                ty,
                left,
                right,
            } => write!(f, "{} = cmp_{} ${} {}, {}", result, op, ty, left, right),
            Instruction::Not {
                result,
                ty,
                operand,
            } => write!(f, "{} = not ${} {}", result, ty, operand),
            Instruction::Select {
                result,
                ty,
                condition,
                then_value,
                else_value,
            } => write!(
                f,
                "{} = select ${} {}, {}, {}",
                result, ty, condition, then_value, else_value
            ),
            Instruction::Convert {
                result,
                kind,
                from,
                to,
                operand,
            } => write!(f, "{} = {} {} : ${} to ${}", result, kind, operand, from, to),
            Instruction::Apply {
                result,
                callee,
                args,
            } => match result {
                Some((value, ty)) => {
                    write!(f, "{} = apply @{}({}) : ${}", value, callee, Args(args), ty)
                }
                None => write!(f, "apply @{}({})", callee, Args(args)),
            },
            Instruction::LoadGlobal { result, ty, global } => {
                write!(f, "{} = load_global @{} : ${}", result, global, ty)
            }
            Instruction::StoreGlobal { global, ty, value } => {
                write!(f, "store_global {} to @{} : ${}", value, global, ty)
            }
            Instruction::CondFail { condition, message } => {
                write!(f, "cond_fail {}, {:?}", condition, message)
            }
            Instruction::DebugValue { value, name } => {
                write!(f, "debug_value {}, let {}", value, name)
            }
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Branch { target, args } => write!(f, "br {}({})", target, Args(args)),
            Terminator::CondBranch {
                condition,
                then_block,
                then_args,
                else_block,
                else_args,
            } => write!(
                f,
                "cond_br {}, {}({}), {}({})",
                condition,
                then_block,
                Args(then_args),
                else_block,
                Args(else_args)
            ),
            Terminator::Switch {
                value,
                ty,
                cases,
                default,
            } => {
                write!(f, "switch ${} {}", ty, value)?;
                for (case, block) in cases {
                    write!(f, ", case {}: {}", case, block)?;
                }
                write!(f, ", default {}", default)
            }
            Terminator::Return(Some(value)) => write!(f, "return {}", value),
            Terminator::Return(None) => write!(f, "return"),
            Terminator::Unreachable => write!(f, "unreachable"),
            Terminator::Invalid => write!(f, "<no terminator>"),
        }
    }
}
