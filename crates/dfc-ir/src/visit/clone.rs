//! Structure-preserving circuit rewrites

use super::circuit::{walk_circuit, walk_file, CircuitVisitor};
use super::{RewriteMap, VisitFlow};
use crate::error::{IrError, IrResult};
use crate::ir::circuit::{Circuit, CircuitNode, Declaration, DeclarationRef, File, FileItem};
use crate::ir::operator::{Operator, OperatorRef};
use std::sync::Arc;

/// Per-node decisions of a [`CloneVisitor`] pass.
///
/// Each hook returns the replacement node, or `None` to drop the node from
/// the output. The defaults keep every node, rebuilding an operator only
/// when its inputs were replaced.
pub trait CircuitRewrite {
    /// Name used in diagnostics
    fn name(&self) -> &str {
        "circuit rewrite"
    }

    /// Whether `op` survives. Called before its inputs are resolved, so an
    /// operator dropped here may read operators that were dropped too.
    fn keep_operator(&mut self, _op: &OperatorRef) -> IrResult<bool> {
        Ok(true)
    }

    /// Replacement for a kept `op`. `inputs` are the already rewritten
    /// inputs, in argument order. Returning `None` drops `op`; its inputs
    /// must have survived.
    fn rewrite_operator(
        &mut self,
        op: &OperatorRef,
        inputs: Vec<OperatorRef>,
    ) -> IrResult<Option<OperatorRef>> {
        rebuild_with_inputs(op, inputs).map(Some)
    }

    /// Replacement for `decl`
    fn rewrite_declaration(&mut self, decl: &DeclarationRef) -> IrResult<Option<DeclarationRef>> {
        Ok(Some(Arc::clone(decl)))
    }
}

/// `op` itself when `inputs` are its current inputs, otherwise a copy reading
/// from `inputs`
pub fn rebuild_with_inputs(op: &OperatorRef, inputs: Vec<OperatorRef>) -> IrResult<OperatorRef> {
    if op.has_inputs(&inputs) {
        Ok(Arc::clone(op))
    } else {
        op.with_inputs(inputs)
    }
}

/// Builds a new circuit (or file) from an existing one.
///
/// Nodes are visited in insertion order and each is mapped to the node the
/// [`CircuitRewrite`] returns, the identity included. Operator inputs are
/// resolved through that map, so every reader of a shared operator reads the
/// same replacement. A node met a second time is not rewritten again: its
/// recorded replacement is reused.
pub struct CloneVisitor<R> {
    rewrite: R,
    operators: RewriteMap<Operator>,
    removed: RewriteMap<Operator>,
    declarations: RewriteMap<Declaration>,
    nodes: Vec<CircuitNode>,
    items: Vec<FileItem>,
    in_circuit: bool,
}

impl<R: CircuitRewrite> CloneVisitor<R> {
    /// Visitor applying `rewrite`
    pub fn new(rewrite: R) -> Self {
        Self {
            rewrite,
            operators: RewriteMap::new(),
            removed: RewriteMap::new(),
            declarations: RewriteMap::new(),
            nodes: Vec::new(),
            items: Vec::new(),
            in_circuit: false,
        }
    }

    fn reset(&mut self) {
        self.operators.clear();
        self.removed.clear();
        self.declarations.clear();
        self.nodes.clear();
        self.items.clear();
        self.in_circuit = false;
    }

    /// Rewrite `circuit` into a new circuit.
    ///
    /// On error nothing of the partial result is kept.
    pub fn apply(&mut self, circuit: &Circuit) -> IrResult<Circuit> {
        self.reset();
        let result = walk_circuit(self, circuit).and_then(|()| match self.items.pop() {
            Some(FileItem::Circuit(rewritten)) => Ok(rewritten),
            _ => Err(IrError::invariant(format!(
                "{} produced no circuit for '{}'",
                self.rewrite.name(),
                circuit.name()
            ))),
        });
        log::debug!(
            "{}: {} of {} operators replaced in circuit '{}'",
            self.rewrite.name(),
            self.operators.replaced(),
            self.operators.len(),
            circuit.name()
        );
        self.reset();
        result
    }

    /// Rewrite every declaration and circuit of `file`
    pub fn apply_file(&mut self, file: &File) -> IrResult<File> {
        self.reset();
        let result = walk_file(self, file).map(|()| File::new(std::mem::take(&mut self.items)));
        self.reset();
        result
    }

    /// The rewrite, with whatever state it accumulated
    pub fn into_rewrite(self) -> R {
        self.rewrite
    }

    fn push(&mut self, node: CircuitNode) {
        if self.in_circuit {
            self.nodes.push(node);
        } else if let CircuitNode::Declaration(decl) = node {
            self.items.push(FileItem::Declaration(decl));
        }
    }

    fn mapped_input(&self, op: &OperatorRef, input: &OperatorRef) -> IrResult<OperatorRef> {
        if let Some(mapped) = self.operators.get(input) {
            return Ok(Arc::clone(mapped));
        }
        let reason = if self.removed.contains(input) {
            "which was removed"
        } else {
            "which has not been visited"
        };
        Err(IrError::traversal(
            self.rewrite.name(),
            format!("{} reads {} {reason}", op.id(), input.id()),
        ))
    }
}

impl<R: CircuitRewrite> CircuitVisitor for CloneVisitor<R> {
    fn preorder_circuit(&mut self, _circuit: &Circuit) -> IrResult<VisitFlow> {
        self.nodes.clear();
        self.in_circuit = true;
        Ok(VisitFlow::Continue)
    }

    fn postorder_circuit(&mut self, circuit: &Circuit) -> IrResult<()> {
        let nodes = std::mem::take(&mut self.nodes);
        self.items
            .push(FileItem::Circuit(Circuit::new(circuit.name(), nodes)));
        self.in_circuit = false;
        Ok(())
    }

    fn preorder_operator(&mut self, op: &OperatorRef) -> IrResult<VisitFlow> {
        if let Some(mapped) = self.operators.get(op) {
            let mapped = Arc::clone(mapped);
            self.push(CircuitNode::Operator(mapped));
            return Ok(VisitFlow::SkipChildren);
        }
        if self.removed.contains(op) {
            return Ok(VisitFlow::SkipChildren);
        }
        Ok(VisitFlow::Continue)
    }

    fn postorder_operator(&mut self, op: &OperatorRef) -> IrResult<()> {
        if !self.rewrite.keep_operator(op)? {
            log::trace!("{}: removed {}", self.rewrite.name(), op.id());
            self.removed.insert(op, Arc::clone(op));
            return Ok(());
        }
        let inputs = op
            .inputs()
            .iter()
            .map(|input| self.mapped_input(op, input))
            .collect::<IrResult<Vec<_>>>()?;
        match self.rewrite.rewrite_operator(op, inputs)? {
            Some(new) => {
                if !Arc::ptr_eq(op, &new) {
                    log::trace!("{}: replaced {}", self.rewrite.name(), op.id());
                }
                self.operators.insert(op, Arc::clone(&new));
                self.push(CircuitNode::Operator(new));
            }
            None => {
                log::trace!("{}: removed {}", self.rewrite.name(), op.id());
                self.removed.insert(op, Arc::clone(op));
            }
        }
        Ok(())
    }

    fn preorder_declaration(&mut self, decl: &DeclarationRef) -> IrResult<VisitFlow> {
        if let Some(mapped) = self.declarations.get(decl) {
            let mapped = Arc::clone(mapped);
            self.push(CircuitNode::Declaration(mapped));
            return Ok(VisitFlow::SkipChildren);
        }
        Ok(VisitFlow::Continue)
    }

    fn postorder_declaration(&mut self, decl: &DeclarationRef) -> IrResult<()> {
        if let Some(new) = self.rewrite.rewrite_declaration(decl)? {
            self.declarations.insert(decl, Arc::clone(&new));
            self.push(CircuitNode::Declaration(new));
        } else {
            log::trace!("{}: removed declaration {}", self.rewrite.name(), decl.name());
        }
        Ok(())
    }
}
