use std::fmt::Display;

use acton_query::hierarchy::TreeNode;

/// Render cents as a decimal amount
pub fn format_price(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}

/// Draw a tree with box-drawing connectors, one node per line
pub fn render_tree<Id: Display>(root: &TreeNode<Id>) -> String {
    let mut out = format!("{} ({})\n", root.name, root.id);
    render_children(&root.children, "", &mut out);
    out
}

fn render_children<Id: Display>(children: &[TreeNode<Id>], prefix: &str, out: &mut String) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let line = format!("{}{}{} ({})\n", prefix, branch, child.name, child.id);
        out.push_str(&line);
        render_children(&child.children, &format!("{}{}", prefix, indent), out);
    }
}

/// Truncate to `width` characters, marking the cut with an ellipsis
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, name: &str, children: Vec<TreeNode<u64>>) -> TreeNode<u64> {
        TreeNode {
            id,
            name: name.to_string(),
            children,
        }
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1999), "19.99");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(-250), "-2.50");
        assert_eq!(format_price(0), "0.00");
    }

    #[test]
    fn test_render_tree() {
        let tree = node(
            1,
            "A",
            vec![
                node(2, "B", vec![node(4, "D", vec![])]),
                node(3, "C", vec![]),
            ],
        );
        assert_eq!(
            render_tree(&tree),
            "A (1)\n├── B (2)\n│   └── D (4)\n└── C (3)\n"
        );
    }

    #[test]
    fn test_render_leaf() {
        assert_eq!(render_tree(&node(7, "Solo", vec![])), "Solo (7)\n");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hammer", 10), "hammer");
        assert_eq!(truncate("cordless drill", 8), "cordles…");
    }
}
