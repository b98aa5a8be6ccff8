use super::{Block, Function, Inst, Module, Terminator, Value};
use std::fmt;

struct List<'a, T>(&'a [T]);

impl<T: fmt::Display> fmt::Display for List<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

fn write_signature(f: &mut fmt::Formatter<'_>, func: &Function) -> fmt::Result {
    write!(f, "({})", List(&func.params))?;
    match func.result {
        Some(ty) => write!(f, " -> {}", ty),
        None => write!(f, " -> void"),
    }
}

fn write_blocks(f: &mut fmt::Formatter<'_>, func: &Function) -> fmt::Result {
    writeln!(f, " {{")?;
    for block in &func.blocks {
        write!(f, "{}", block)?;
    }
    writeln!(f, "}}")
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define @{}", self.name)?;
        write_signature(f, self)?;
        write_blocks(f, self)
    }
}

/// A function printed without its name.
pub struct FunctionBody<'a>(pub(super) &'a Function);

impl fmt::Display for FunctionBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define ")?;
        write_signature(f, self.0)?;
        write_blocks(f, self.0)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; vir module {}", self.name)?;
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.id)?;
        for (i, (value, ty)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", value, ty)?;
        }
        writeln!(f, "):")?;
        for inst in &self.insts {
            writeln!(f, "  {}", inst)?;
        }
        writeln!(f, "  {}", self.term)
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Const { dst, ty, bits } => write!(f, "{} = const.{} {:#x}", dst, ty, bits),
            Inst::Binary {
                dst,
                op,
                ty,
                lhs,
                rhs,
            } => write!(f, "{} = {}.{} {}, {}", dst, op, ty, lhs, rhs),
            Inst::Overflow {
                dst,
                flag,
                op,
                ty,
                lhs,
                rhs,
            } => write!(f, "{}, {} = {}.{} {}, {}", dst, flag, op, ty, lhs, rhs),
            Inst::Not { dst, ty, arg } => write!(f, "{} = not.{} {}", dst, ty, arg),
            Inst::Neg { dst, ty, arg } => write!(f, "{} = neg.{} {}", dst, ty, arg),
            Inst::Icmp {
                dst,
                cond,
                ty,
                lhs,
                rhs,
            } => write!(f, "{} = icmp.{} {}.{}, {}", dst, ty, cond, lhs, rhs),
            Inst::Select {
                dst,
                ty,
                cond,
                if_true,
                if_false,
            } => write!(
                f,
                "{} = select.{} {}, {}, {}",
                dst, ty, cond, if_true, if_false
            ),
            Inst::Extend {
                dst,
                kind,
                from,
                to,
                arg,
            } => write!(f, "{} = {} {} {} to {}", dst, kind, from, arg, to),
            Inst::Call {
                results,
                callee,
                args,
            } => {
                if !results.is_empty() {
                    let values: Vec<Value> = results.iter().map(|(v, _)| *v).collect();
                    write!(f, "{} = ", List(&values))?;
                }
                write!(f, "call @{}({})", callee, List(args))
            }
            Inst::Load { dst, ty, global } => write!(f, "{} = load.{} @{}", dst, ty, global),
            Inst::Store { global, ty, value } => {
                write!(f, "store.{} {}, @{}", ty, value, global)
            }
            Inst::TrapIf { cond, code } => write!(f, "trapif {}, {}", cond, code),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jump { target, args } => write!(f, "jump {}({})", target, List(args)),
            Terminator::Branch {
                cond,
                then_target,
                then_args,
                else_target,
                else_args,
            } => write!(
                f,
                "br {}, {}({}), {}({})",
                cond,
                then_target,
                List(then_args),
                else_target,
                List(else_args)
            ),
            Terminator::Return(values) if values.is_empty() => write!(f, "ret"),
            Terminator::Return(values) => write!(f, "ret {}", List(values)),
            Terminator::Trap { code } => write!(f, "trap {}", code),
        }
    }
}
