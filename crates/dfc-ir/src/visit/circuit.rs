//! Visitor over the circuit layer: files, circuits, operators and declarations

use super::VisitFlow;
use crate::error::IrResult;
use crate::ir::circuit::{Circuit, CircuitNode, DeclarationRef, File, FileItem};
use crate::ir::operator::OperatorRef;

/// Hooks called while walking a file or circuit.
///
/// Top-level nodes are visited in insertion order. Operators are leaves at
/// this layer: their inputs are earlier nodes of the same circuit and are not
/// revisited. Use [`super::CircuitDelegateVisitor`] to reach the expressions
/// attached to each node.
pub trait CircuitVisitor {
    /// Before the items of `file`
    fn preorder_file(&mut self, _file: &File) -> IrResult<VisitFlow> {
        Ok(VisitFlow::Continue)
    }

    /// After the items of `file`
    fn postorder_file(&mut self, _file: &File) -> IrResult<()> {
        Ok(())
    }

    /// Before the nodes of `circuit`
    fn preorder_circuit(&mut self, _circuit: &Circuit) -> IrResult<VisitFlow> {
        Ok(VisitFlow::Continue)
    }

    /// After the nodes of `circuit`
    fn postorder_circuit(&mut self, _circuit: &Circuit) -> IrResult<()> {
        Ok(())
    }

    /// On reaching `op`
    fn preorder_operator(&mut self, _op: &OperatorRef) -> IrResult<VisitFlow> {
        Ok(VisitFlow::Continue)
    }

    /// After `op`, unless its preorder hook skipped it
    fn postorder_operator(&mut self, _op: &OperatorRef) -> IrResult<()> {
        Ok(())
    }

    /// On reaching `decl`
    fn preorder_declaration(&mut self, _decl: &DeclarationRef) -> IrResult<VisitFlow> {
        Ok(VisitFlow::Continue)
    }

    /// After `decl`, unless its preorder hook skipped it
    fn postorder_declaration(&mut self, _decl: &DeclarationRef) -> IrResult<()> {
        Ok(())
    }
}

/// Walk every item of `file` in order
pub fn walk_file<V: CircuitVisitor + ?Sized>(visitor: &mut V, file: &File) -> IrResult<()> {
    if visitor.preorder_file(file)? == VisitFlow::SkipChildren {
        return Ok(());
    }
    for item in file.items() {
        match item {
            FileItem::Declaration(decl) => walk_declaration(visitor, decl)?,
            FileItem::Circuit(circuit) => walk_circuit(visitor, circuit)?,
        }
    }
    visitor.postorder_file(file)
}

/// Walk every node of `circuit` in insertion order
pub fn walk_circuit<V: CircuitVisitor + ?Sized>(visitor: &mut V, circuit: &Circuit) -> IrResult<()> {
    if visitor.preorder_circuit(circuit)? == VisitFlow::SkipChildren {
        return Ok(());
    }
    for node in circuit.nodes() {
        match node {
            CircuitNode::Declaration(decl) => walk_declaration(visitor, decl)?,
            CircuitNode::Operator(op) => walk_operator(visitor, op)?,
        }
    }
    visitor.postorder_circuit(circuit)
}

/// Visit one operator
pub fn walk_operator<V: CircuitVisitor + ?Sized>(visitor: &mut V, op: &OperatorRef) -> IrResult<()> {
    if visitor.preorder_operator(op)? == VisitFlow::SkipChildren {
        return Ok(());
    }
    visitor.postorder_operator(op)
}

/// Visit one declaration
pub fn walk_declaration<V: CircuitVisitor + ?Sized>(
    visitor: &mut V,
    decl: &DeclarationRef,
) -> IrResult<()> {
    if visitor.preorder_declaration(decl)? == VisitFlow::SkipChildren {
        return Ok(());
    }
    visitor.postorder_declaration(decl)
}
