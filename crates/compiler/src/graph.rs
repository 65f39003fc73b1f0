//! Graphviz rendering of the parse tree.
//!
//! Interior nodes are boxes labeled with the production name; leaves are
//! diamonds holding the literal or identifier text. The output is a
//! self-contained `digraph` suitable for `dot -Tpng`.

use crate::ast::{
    BlockItem, Expr, ExternKind, GlobalDecl, Initializer, Literal, Program, Statement, VarType,
};

struct TreeNode {
    label: String,
    leaf: bool,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn branch(label: &str, children: Vec<TreeNode>) -> Self {
        TreeNode {
            label: label.to_string(),
            leaf: false,
            children,
        }
    }

    fn leaf(label: impl Into<String>) -> Self {
        TreeNode {
            label: label.into(),
            leaf: true,
            children: Vec::new(),
        }
    }
}

/// Render a program's parse tree as Graphviz text.
pub fn render_parse_tree(program: &Program) -> String {
    let root = program_node(program);
    let mut out = String::from("digraph parse_tree {\n    node [shape = box];\n");
    let mut counter = 0usize;
    emit(&root, "node0", &mut counter, &mut out);
    out.push_str("}\n");
    out
}

fn emit(node: &TreeNode, id: &str, counter: &mut usize, out: &mut String) {
    if node.leaf {
        out.push_str(&format!(
            "    {} [label = \"{}\", shape = \"diamond\"]\n",
            id,
            escape(&node.label)
        ));
        return;
    }
    out.push_str(&format!("    {} [label = \"{}\"]\n", id, escape(&node.label)));
    let ids: Vec<String> = node
        .children
        .iter()
        .map(|_| {
            *counter += 1;
            format!("node{}", counter)
        })
        .collect();
    for child_id in &ids {
        out.push_str(&format!("    {} -> {}\n", id, child_id));
    }
    for (child, child_id) in node.children.iter().zip(&ids) {
        emit(child, child_id, counter, out);
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn program_node(program: &Program) -> TreeNode {
    TreeNode::branch(
        "program",
        program.decls.iter().map(decl_node).collect(),
    )
}

fn type_node(ty: &VarType) -> TreeNode {
    match ty {
        VarType::Prim(p) => TreeNode::branch("PRIM_TYPE", vec![TreeNode::leaf(p.name())]),
        VarType::Array { elem, len } => TreeNode::branch(
            "array_decl",
            vec![
                TreeNode::leaf(elem.name()),
                match len {
                    Some(n) => TreeNode::leaf(n.to_string()),
                    None => TreeNode::leaf("[]"),
                },
            ],
        ),
    }
}

fn decl_node(decl: &GlobalDecl) -> TreeNode {
    match decl {
        GlobalDecl::Variable(v) => TreeNode::branch(
            "global_var",
            vec![
                type_node(&v.ty),
                TreeNode::leaf(v.name.as_str()),
                initializer_node(&v.value),
            ],
        ),
        GlobalDecl::Function(f) => TreeNode::branch(
            "function",
            vec![
                TreeNode::leaf(f.ret.to_string()),
                TreeNode::leaf(f.name.as_str()),
                TreeNode::branch(
                    "par_list",
                    f.params.iter().map(|p| TreeNode::leaf(p.as_str())).collect(),
                ),
                statement_node(&f.body),
            ],
        ),
        GlobalDecl::Export { name, function } => TreeNode::branch(
            "export",
            vec![
                TreeNode::leaf(name.as_str()),
                TreeNode::leaf(if *function { "()" } else { "var" }),
            ],
        ),
        GlobalDecl::Extern(ext) => {
            let mut children = vec![TreeNode::leaf(
                ext.linkage.clone().unwrap_or_else(|| "native".to_string()),
            )];
            match &ext.kind {
                ExternKind::Variable(ty) => {
                    children.push(type_node(ty));
                    children.push(TreeNode::leaf(ext.name.as_str()));
                }
                ExternKind::Function { ret, params, varargs } => {
                    children.push(TreeNode::leaf(ret.to_string()));
                    children.push(TreeNode::leaf(ext.name.as_str()));
                    let mut pars: Vec<TreeNode> =
                        params.iter().map(|p| TreeNode::leaf(p.as_str())).collect();
                    if *varargs {
                        pars.push(TreeNode::leaf("..."));
                    }
                    children.push(TreeNode::branch("par_list", pars));
                }
            }
            TreeNode::branch("extern", children)
        }
    }
}

fn initializer_node(init: &Initializer) -> TreeNode {
    match init {
        Initializer::Literal(l) => literal_node(l),
        Initializer::Array(elems) => {
            TreeNode::branch("array_lit", elems.iter().map(literal_node).collect())
        }
    }
}

fn literal_node(lit: &Literal) -> TreeNode {
    let tag = match lit {
        Literal::Int(_) => "INT_LIT",
        Literal::Char(_) => "CHAR_LIT",
        Literal::Str(_) => "STRING_LIT",
    };
    TreeNode::branch(tag, vec![TreeNode::leaf(lit.to_string())])
}

fn statement_node(stmt: &Statement) -> TreeNode {
    match stmt {
        Statement::Empty => TreeNode::leaf(";"),
        Statement::Expr(e) => expr_node(e),
        Statement::Block(items) => TreeNode::branch(
            "block",
            items
                .iter()
                .map(|item| match item {
                    BlockItem::Decl(d) => TreeNode::branch(
                        "var_decl",
                        vec![type_node(&d.ty), TreeNode::leaf(d.name.as_str())],
                    ),
                    BlockItem::Stmt(s) => statement_node(s),
                })
                .collect(),
        ),
        Statement::If { cond, then, els } => {
            let mut children = vec![expr_node(cond), statement_node(then)];
            if let Some(els) = els {
                children.push(statement_node(els));
            }
            TreeNode::branch("if_stmt", children)
        }
        Statement::While { cond, body } => TreeNode::branch(
            "while_loop",
            vec![expr_node(cond), statement_node(body)],
        ),
        Statement::Break => TreeNode::branch("break_stmt", vec![]),
        Statement::Continue => TreeNode::branch("continue_stmt", vec![]),
        Statement::Return(None) => TreeNode::branch("return", vec![]),
        Statement::Return(Some(e)) => TreeNode::branch("return", vec![expr_node(e)]),
    }
}

fn expr_node(expr: &Expr) -> TreeNode {
    match expr {
        Expr::Literal(l) => literal_node(l),
        Expr::Ident(name) => TreeNode::branch("IDENT", vec![TreeNode::leaf(name.as_str())]),
        Expr::ArrayAccess { name, index } => TreeNode::branch(
            "array_acc",
            vec![TreeNode::leaf(name.as_str()), expr_node(index)],
        ),
        Expr::Deref { expr, byte } => TreeNode::branch(
            "deref",
            vec![
                TreeNode::leaf(if *byte { "#" } else { "*" }),
                expr_node(expr),
            ],
        ),
        Expr::Address(lv) => TreeNode::branch("address", vec![expr_node(lv)]),
        Expr::Unary { op, expr } => TreeNode::branch(
            "unary",
            vec![TreeNode::leaf(op.lexeme()), expr_node(expr)],
        ),
        Expr::Binary { op, lhs, rhs } => TreeNode::branch(
            "bin_expr",
            vec![TreeNode::leaf(op.lexeme()), expr_node(lhs), expr_node(rhs)],
        ),
        Expr::Call { name, args } => TreeNode::branch(
            "function_call",
            vec![
                TreeNode::leaf(name.as_str()),
                TreeNode::branch("arg_list", args.iter().map(expr_node).collect()),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    #[test]
    fn test_render_simple_program() {
        let mut parser = Parser::from_source("int x = 5; void f() { x = x + 1; }");
        let program = parser.parse().unwrap();
        let dot = render_parse_tree(&program);
        assert!(dot.starts_with("digraph parse_tree {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("global_var"));
        assert!(dot.contains("bin_expr"));
        assert!(dot.contains("shape = \"diamond\""));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let mut parser = Parser::from_source("void f() { a = 1; b = 2; }");
        let program = parser.parse().unwrap();
        let dot = render_parse_tree(&program);
        let mut declared = std::collections::HashSet::new();
        for line in dot.lines() {
            if let Some(rest) = line.trim().strip_prefix("node") {
                if let Some((id, _)) = rest.split_once(' ') {
                    if !rest.contains("->") {
                        assert!(declared.insert(id.to_string()), "duplicate node id {}", id);
                    }
                }
            }
        }
        assert!(declared.len() > 5);
    }

    #[test]
    fn test_escapes_quotes_and_backslashes() {
        let mut parser = Parser::from_source("char s[] = \"a\\n\";");
        let program = parser.parse().unwrap();
        let dot = render_parse_tree(&program);
        assert!(dot.contains("\\\\n"));
    }
}
