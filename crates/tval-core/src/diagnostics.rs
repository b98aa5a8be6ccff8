/*! Structural and type checks over a program module.
 *
 * These run when a module leaves the raw stage. A raw module may come straight from a frontend or
 * a JSON file, so nothing downstream assumes it is well formed until these checks come back empty.
 */

use crate::block::{BlockId, Terminator};
use crate::dominance::DominatorTree;
use crate::function::{Function, FunctionBody};
use crate::instructions::{CompareOp, ConvertKind, Instruction};
use crate::module::Module;
use crate::stage::Stage;
use crate::types::Type;
use crate::values::ValueId;
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    NameMismatch,
    MissingTerminator,
    UnknownBlock,
    ArgumentCount,
    TypeMismatch,
    Redefinition,
    UndefinedValue,
    UnknownCallee,
    UnknownGlobal,
    IllegalConversion,
    HighLevelConstruct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub function: Option<String>,
    pub block: Option<BlockId>,
    pub message: String,
}

impl Diagnostic {
    fn module_level(kind: DiagnosticKind, message: String) -> Self {
        Self {
            kind,
            function: None,
            block: None,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.function, self.block) {
            (Some(func), Some(block)) => write!(f, "@{} {}: {}", func, block, self.message),
            (Some(func), None) => write!(f, "@{}: {}", func, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

pub fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Runs every check over `module` and returns what it found. An empty result
/// means the module is well formed for its current stage.
pub fn run_diagnostic_passes(module: &Module) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (key, global) in &module.globals {
        if key != &global.name {
            diagnostics.push(Diagnostic::module_level(
                DiagnosticKind::NameMismatch,
                format!("global registered as '{}' is named '{}'", key, global.name),
            ));
        }
    }

    for (key, function) in &module.functions {
        if key != &function.name {
            diagnostics.push(Diagnostic::module_level(
                DiagnosticKind::NameMismatch,
                format!("function registered as '{}' is named '{}'", key, function.name),
            ));
        }
        if let Some(body) = &function.body {
            FunctionChecker::new(module, function, body).run(&mut diagnostics);
        }
    }

    diagnostics
}

struct FunctionChecker<'a> {
    module: &'a Module,
    function: &'a Function,
    body: &'a FunctionBody,
    types: HashMap<ValueId, Type>,
    def_blocks: HashMap<ValueId, BlockId>,
    dominators: DominatorTree,
    out: Vec<Diagnostic>,
}

impl<'a> FunctionChecker<'a> {
    fn new(module: &'a Module, function: &'a Function, body: &'a FunctionBody) -> Self {
        Self {
            module,
            function,
            body,
            types: body.value_types(),
            def_blocks: defining_blocks(body),
            dominators: DominatorTree::build(body),
            out: Vec::new(),
        }
    }

    fn report(&mut self, kind: DiagnosticKind, block: Option<BlockId>, message: String) {
        self.out.push(Diagnostic {
            kind,
            function: Some(self.function.name.clone()),
            block,
            message,
        });
    }

    fn run(mut self, diagnostics: &mut Vec<Diagnostic>) {
        self.check_entry();
        self.check_definitions();
        let body = self.body;
        for block in body.blocks.values() {
            self.check_block(block.id);
        }
        diagnostics.append(&mut self.out);
    }

    fn check_entry(&mut self) {
        let body = self.body;
        let entry = body.entry_block;
        let Some(block) = body.get_block(entry) else {
            self.report(
                DiagnosticKind::UnknownBlock,
                None,
                format!("entry block {} does not exist", entry),
            );
            return;
        };
        let param_types: Vec<Type> = block.params.iter().map(|p| p.ty).collect();
        if param_types != self.function.ty.params {
            self.report(
                DiagnosticKind::TypeMismatch,
                Some(entry),
                format!(
                    "entry parameters ({}) do not match signature {}",
                    join_types(&param_types),
                    self.function.ty
                ),
            );
        }
    }

    fn check_definitions(&mut self) {
        let mut seen = HashSet::new();
        let mut redefined = Vec::new();
        let body = self.body;
        for block in body.blocks.values() {
            let defs = block
                .params
                .iter()
                .map(|p| p.value)
                .chain(
                    block
                        .instructions
                        .iter()
                        .flat_map(|inst| inst.definitions().into_iter().map(|(v, _)| v)),
                );
            for value in defs {
                if !seen.insert(value) {
                    redefined.push((block.id, value));
                }
            }
        }
        for (block, value) in redefined {
            self.report(
                DiagnosticKind::Redefinition,
                Some(block),
                format!("{} is defined more than once", value),
            );
        }
    }

    fn check_block(&mut self, id: BlockId) {
        let body = self.body;
        let Some(block) = body.get_block(id) else {
            return;
        };

        let local_defs: HashMap<ValueId, usize> = block
            .instructions
            .iter()
            .enumerate()
            .flat_map(|(idx, inst)| inst.definitions().into_iter().map(move |(v, _)| (v, idx)))
            .collect();

        for (idx, inst) in block.instructions.iter().enumerate() {
            for operand in inst.operands() {
                match local_defs.get(&operand) {
                    Some(def_idx) if *def_idx >= idx => self.report(
                        DiagnosticKind::UndefinedValue,
                        Some(id),
                        format!("{} is used before its definition", operand),
                    ),
                    _ => self.require_defined(id, operand),
                }
            }
            if self.module.stage() >= Stage::Lowered && inst.is_high_level() {
                self.report(
                    DiagnosticKind::HighLevelConstruct,
                    Some(id),
                    format!("{} is not allowed after lowering", inst.opcode_name()),
                );
            }
            self.check_instruction(id, inst);
        }

        for operand in block.terminator.operands() {
            self.require_defined(id, operand);
        }
        self.check_terminator(id, &block.terminator);
    }

    fn require_defined(&mut self, block: BlockId, value: ValueId) {
        if !self.types.contains_key(&value) {
            self.report(
                DiagnosticKind::UndefinedValue,
                Some(block),
                format!("{} is never defined", value),
            );
            return;
        }
        // Uses in unreachable blocks are not checked.
        if !self.dominators.is_reachable(block) {
            return;
        }
        if let Some(def) = self.def_blocks.get(&value).copied() {
            if def != block && !self.dominators.dominates(def, block) {
                self.report(
                    DiagnosticKind::UndefinedValue,
                    Some(block),
                    format!("{} (defined in {}) does not dominate its use", value, def),
                );
            }
        }
    }

    fn expect_type(&mut self, block: BlockId, value: ValueId, expected: Type, what: &str) {
        if let Some(actual) = self.types.get(&value).copied() {
            if actual != expected {
                self.report(
                    DiagnosticKind::TypeMismatch,
                    Some(block),
                    format!("{} {} has type {}, expected {}", what, value, actual, expected),
                );
            }
        }
    }

    fn check_instruction(&mut self, block: BlockId, inst: &Instruction) {
        match inst {
            Instruction::IntegerLiteral { ty, .. } => {
                if !ty.is_integer() {
                    self.report(
                        DiagnosticKind::TypeMismatch,
                        Some(block),
                        "integer_literal must have an integer type".to_string(),
                    );
                }
            }
            Instruction::Binary {
                op,
                ty,
                left,
                right,
                ..
            } => {
                self.expect_type(block, *left, *ty, "operand");
                self.expect_type(block, *right, *ty, "operand");
                if *ty == Type::Bool && !op.is_bitwise() {
                    self.report(
                        DiagnosticKind::TypeMismatch,
                        Some(block),
                        format!("{} is not defined on bool", op),
                    );
                }
            }
            Instruction::Compare {
                op,
                ty,
                left,
                right,
                ..
            } => {
                self.expect_type(block, *left, *ty, "operand");
                self.expect_type(block, *right, *ty, "operand");
                if *ty == Type::Bool && !matches!(op, CompareOp::Eq | CompareOp::Ne) {
                    self.report(
                        DiagnosticKind::TypeMismatch,
                        Some(block),
                        format!("cmp_{} is not defined on bool", op),
                    );
                }
            }
            Instruction::CheckedArith {
                ty, left, right, ..
            }
            | Instruction::ArithWithOverflow {
                ty, left, right, ..
            } => {
                self.expect_type(block, *left, *ty, "operand");
                self.expect_type(block, *right, *ty, "operand");
                if !ty.is_integer() {
                    self.report(
                        DiagnosticKind::TypeMismatch,
                        Some(block),
                        format!("{} needs an integer type", inst.opcode_name()),
                    );
                }
            }
            Instruction::Not { ty, operand, .. } => {
                self.expect_type(block, *operand, *ty, "operand");
            }
            Instruction::Select {
                ty,
                condition,
                then_value,
                else_value,
                ..
            } => {
                self.expect_type(block, *condition, Type::Bool, "condition");
                self.expect_type(block, *then_value, *ty, "operand");
                self.expect_type(block, *else_value, *ty, "operand");
            }
            Instruction::Convert {
                kind,
                from,
                to,
                operand,
                ..
            } => {
                self.expect_type(block, *operand, *from, "operand");
                let legal = match kind {
                    ConvertKind::ZeroExtend | ConvertKind::SignExtend => from.bits() < to.bits(),
                    ConvertKind::Truncate => from.bits() > to.bits(),
                } && *to != Type::Bool;
                if !legal {
                    self.report(
                        DiagnosticKind::IllegalConversion,
                        Some(block),
                        format!("cannot {} from {} to {}", kind, from, to),
                    );
                }
            }
            Instruction::Apply {
                result,
                callee,
                args,
            } => self.check_apply(block, callee, args, result.map(|(_, ty)| ty)),
            Instruction::LoadGlobal { ty, global, .. } => self.check_global(block, global, *ty),
            Instruction::StoreGlobal { global, ty, value } => {
                self.check_global(block, global, *ty);
                self.expect_type(block, *value, *ty, "stored value");
            }
            Instruction::CondFail { condition, .. } => {
                self.expect_type(block, *condition, Type::Bool, "condition");
            }
            Instruction::BoolLiteral { .. } | Instruction::DebugValue { .. } => {}
        }
    }

    fn check_apply(
        &mut self,
        block: BlockId,
        callee: &str,
        args: &[ValueId],
        result: Option<Type>,
    ) {
        let module = self.module;
        let Some(target) = module.get_function(callee) else {
            self.report(
                DiagnosticKind::UnknownCallee,
                Some(block),
                format!("call to unknown function @{}", callee),
            );
            return;
        };
        let signature = target.ty.clone();
        if signature.params.len() != args.len() {
            self.report(
                DiagnosticKind::ArgumentCount,
                Some(block),
                format!(
                    "@{} takes {} argument(s), {} given",
                    callee,
                    signature.params.len(),
                    args.len()
                ),
            );
            return;
        }
        for (arg, ty) in args.iter().zip(&signature.params) {
            self.expect_type(block, *arg, *ty, "argument");
        }
        if signature.result != result {
            self.report(
                DiagnosticKind::TypeMismatch,
                Some(block),
                format!("result of @{} does not match its signature", callee),
            );
        }
    }

    fn check_global(&mut self, block: BlockId, name: &str, ty: Type) {
        let module = self.module;
        match module.get_global(name).map(|g| g.ty) {
            None => self.report(
                DiagnosticKind::UnknownGlobal,
                Some(block),
                format!("unknown global @{}", name),
            ),
            Some(actual) if actual != ty => self.report(
                DiagnosticKind::TypeMismatch,
                Some(block),
                format!("global @{} has type {}, accessed as {}", name, actual, ty),
            ),
            Some(_) => {}
        }
    }

    fn check_terminator(&mut self, block: BlockId, term: &Terminator) {
        match term {
            Terminator::Invalid => {
                self.report(
                    DiagnosticKind::MissingTerminator,
                    Some(block),
                    "block has no terminator".to_string(),
                );
                return;
            }
            Terminator::CondBranch { condition, .. } => {
                self.expect_type(block, *condition, Type::Bool, "branch condition");
            }
            Terminator::Switch { value, ty, .. } => {
                if !ty.is_integer() {
                    self.report(
                        DiagnosticKind::TypeMismatch,
                        Some(block),
                        format!("switch needs an integer operand, found {}", ty),
                    );
                }
                self.expect_type(block, *value, *ty, "switch operand");
                if self.module.stage() >= Stage::Lowered {
                    self.report(
                        DiagnosticKind::HighLevelConstruct,
                        Some(block),
                        "switch is not allowed after lowering".to_string(),
                    );
                }
            }
            Terminator::Return(value) => match (value, self.function.ty.result) {
                (Some(v), Some(ty)) => self.expect_type(block, *v, ty, "returned value"),
                (None, None) => {}
                _ => self.report(
                    DiagnosticKind::TypeMismatch,
                    Some(block),
                    format!("return does not match signature {}", self.function.ty),
                ),
            },
            Terminator::Branch { .. } | Terminator::Unreachable => {}
        }

        let body = self.body;
        for (target, args) in term.edges() {
            let Some(succ) = body.get_block(target) else {
                self.report(
                    DiagnosticKind::UnknownBlock,
                    Some(block),
                    format!("branch to unknown block {}", target),
                );
                continue;
            };
            if target == body.entry_block {
                self.report(
                    DiagnosticKind::UnknownBlock,
                    Some(block),
                    "the entry block cannot be a branch target".to_string(),
                );
            }
            if succ.params.len() != args.len() {
                self.report(
                    DiagnosticKind::ArgumentCount,
                    Some(block),
                    format!(
                        "{} takes {} argument(s), {} passed",
                        target,
                        succ.params.len(),
                        args.len()
                    ),
                );
                continue;
            }
            let expected: Vec<Type> = succ.params.iter().map(|p| p.ty).collect();
            for (arg, ty) in args.iter().zip(expected) {
                self.expect_type(block, *arg, ty, "block argument");
            }
        }
    }
}

fn defining_blocks(body: &FunctionBody) -> HashMap<ValueId, BlockId> {
    let mut defs = HashMap::new();
    for block in body.blocks.values() {
        for param in &block.params {
            defs.insert(param.value, block.id);
        }
        for inst in &block.instructions {
            for (value, _) in inst.definitions() {
                defs.insert(value, block.id);
            }
        }
    }
    defs
}

fn join_types(types: &[Type]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModuleBuilder;

    #[test]
    fn test_well_formed_module_has_no_diagnostics() {
        let mut mb = ModuleBuilder::new("m");
        let mut fb = mb.function("add", vec![Type::I32, Type::I32], Some(Type::I32));
        let (a, b) = (fb.param(0), fb.param(1));
        let mut entry = fb.entry_block();
        let sum = entry.add(Type::I32, a, b);
        entry.ret(Some(sum));
        fb.build().unwrap();
        let module = mb.build().unwrap();

        assert!(run_diagnostic_passes(&module).is_empty());
    }

    #[test]
    fn test_reports_missing_terminator_and_type_mismatch() {
        let mut mb = ModuleBuilder::new("m");
        let mut fb = mb.function("bad", vec![Type::I32, Type::I64], Some(Type::I32));
        let (a, b) = (fb.param(0), fb.param(1));
        let mut entry = fb.entry_block();
        entry.add(Type::I32, a, b);
        fb.build().unwrap();
        let module = mb.build().unwrap();

        let kinds: Vec<DiagnosticKind> = run_diagnostic_passes(&module)
            .into_iter()
            .map(|d| d.kind)
            .collect();
        assert!(kinds.contains(&DiagnosticKind::TypeMismatch));
        assert!(kinds.contains(&DiagnosticKind::MissingTerminator));
    }

    #[test]
    fn test_reports_unknown_callee() {
        let mut mb = ModuleBuilder::new("m");
        let mut fb = mb.function("caller", vec![], None);
        let mut entry = fb.entry_block();
        entry.apply("missing", vec![], None);
        entry.ret(None);
        fb.build().unwrap();
        let module = mb.build().unwrap();

        let diagnostics = run_diagnostic_passes(&module);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnknownCallee);
    }

    #[test]
    fn test_reports_use_not_dominated_by_its_definition() {
        let mut mb = ModuleBuilder::new("m");
        let mut fb = mb.function("leak", vec![Type::Bool], Some(Type::I32));
        let c = fb.param(0);
        let left = fb.create_block();
        let right = fb.create_block();
        fb.entry_block().branch(c, left, vec![], right, vec![]);
        let seven = {
            let mut block = fb.switch_to_block(left).unwrap();
            let seven = block.iconst(Type::I32, 7);
            block.ret(Some(seven));
            seven
        };
        fb.switch_to_block(right).unwrap().ret(Some(seven));
        fb.build().unwrap();
        let module = mb.build().unwrap();

        let diagnostics = run_diagnostic_passes(&module);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UndefinedValue);
        assert_eq!(diagnostics[0].block, Some(right));
        assert!(diagnostics[0].message.contains("does not dominate"));
    }

    #[test]
    fn test_value_from_dominating_block_is_accepted() {
        let mut mb = ModuleBuilder::new("m");
        let mut fb = mb.function("carry", vec![Type::Bool], Some(Type::I32));
        let c = fb.param(0);
        let left = fb.create_block();
        let right = fb.create_block();
        let seven = {
            let mut entry = fb.entry_block();
            let seven = entry.iconst(Type::I32, 7);
            entry.branch(c, left, vec![], right, vec![]);
            seven
        };
        fb.switch_to_block(left).unwrap().ret(Some(seven));
        fb.switch_to_block(right).unwrap().ret(Some(seven));
        fb.build().unwrap();
        let module = mb.build().unwrap();

        assert!(run_diagnostic_passes(&module).is_empty());
    }
}
