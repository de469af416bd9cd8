use super::{PartKind, Production, ProductionMatch, ProductionPart};
use ptree::TreeItem;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

impl ProductionPart {
    pub fn terminal(name: &str) -> Self {
        Self {
            kind: PartKind::Terminal(name.to_string()),
            order_important: true,
        }
    }

    pub fn non_terminal(name: &str) -> Self {
        Self {
            kind: PartKind::NonTerminal(name.to_string()),
            order_important: true,
        }
    }

    pub fn optional(part: ProductionPart) -> Self {
        Self {
            kind: PartKind::Optional(Box::new(part)),
            order_important: true,
        }
    }

    pub fn zero_or_more(part: ProductionPart) -> Self {
        Self {
            kind: PartKind::ZeroOrMore(Box::new(part)),
            order_important: true,
        }
    }

    pub fn one_or_more(part: ProductionPart) -> Self {
        Self {
            kind: PartKind::OneOrMore(Box::new(part)),
            order_important: true,
        }
    }

    pub fn group(parts: Vec<ProductionPart>) -> Self {
        Self {
            kind: PartKind::Group(parts),
            order_important: true,
        }
    }

    pub fn with_order_important(mut self, order_important: bool) -> Self {
        self.order_important = order_important;
        self
    }

    /// The terminal name this part matches directly, if it is a plain
    /// terminal part.
    pub fn terminal_name(&self) -> Option<&str> {
        match &self.kind {
            PartKind::Terminal(name) => Some(name),
            _ => None,
        }
    }
}

impl Display for ProductionPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            PartKind::Terminal(name) | PartKind::NonTerminal(name) => write!(f, "{}", name),
            PartKind::Optional(part) => write!(f, "{}?", part),
            PartKind::ZeroOrMore(part) => write!(f, "{}*", part),
            PartKind::OneOrMore(part) => write!(f, "{}+", part),
            PartKind::Group(parts) => {
                write!(f, "(")?;
                for (index, part) in parts.iter().enumerate() {
                    if index != 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Production {
    /// Create a new production without parts.
    /// ### Arguments
    /// * `name` - An unique rule name within the owning grammar.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parts: Vec::new(),
            callback: None,
        }
    }

    /// Create a new production with an ordered list of parts.
    pub fn with_parts(name: &str, parts: Vec<ProductionPart>) -> Self {
        Self {
            name: name.to_string(),
            parts,
            callback: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parts(&self) -> &[ProductionPart] {
        &self.parts
    }

    pub fn add_part(&mut self, part: ProductionPart) {
        self.parts.push(part);
    }

    /// Attach the legacy per-production hook. The engine invokes it with
    /// every match of this production, before the registered callbacks.
    pub fn set_callback(&mut self, callback: Rc<dyn Fn(&ProductionMatch)>) {
        self.callback = Some(callback);
    }

    pub(crate) fn callback(&self) -> Option<&Rc<dyn Fn(&ProductionMatch)>> {
        self.callback.as_ref()
    }

    /// The terminal name of the first production part, if that part is a
    /// plain terminal. The engine matches the next token against this.
    pub fn leading_terminal(&self) -> Option<&str> {
        self.parts.first().and_then(|part| part.terminal_name())
    }

    /// Render the part tree of the production.
    pub fn print(&self) -> std::io::Result<()> {
        ptree::print_tree(&PartTreeNode::from_production(self))
    }
}

impl Display for Production {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Debug for Production {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Production")
            .field("name", &self.name)
            .field("parts", &self.parts)
            .finish()
    }
}

impl PartialEq for Production {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.parts == other.parts
    }
}

impl ProductionMatch {
    pub fn new(production: Rc<Production>, matched: String, start: usize, end: usize) -> Self {
        Self {
            production,
            matched,
            start,
            end,
        }
    }

    pub fn production_name(&self) -> &str {
        self.production.name()
    }
}

impl PartialEq for ProductionMatch {
    fn eq(&self, other: &Self) -> bool {
        self.production.name() == other.production.name()
            && self.matched == other.matched
            && self.start == other.start
            && self.end == other.end
    }
}

impl Display for ProductionMatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} # {}-{} '{}'",
            self.production.name(),
            self.start,
            self.end,
            self.matched
        )
    }
}

#[derive(Clone)]
struct PartTreeNode {
    label: String,
    children: Vec<PartTreeNode>,
}

impl PartTreeNode {
    fn from_production(production: &Production) -> Self {
        Self {
            label: production.name.clone(),
            children: production.parts.iter().map(Self::from_part).collect(),
        }
    }

    fn from_part(part: &ProductionPart) -> Self {
        match &part.kind {
            PartKind::Terminal(name) => Self {
                label: format!("{} (terminal)", name),
                children: Vec::with_capacity(0),
            },
            PartKind::NonTerminal(name) => Self {
                label: format!("{} (rule)", name),
                children: Vec::with_capacity(0),
            },
            PartKind::Optional(inner) => Self {
                label: "optional".to_string(),
                children: vec![Self::from_part(inner)],
            },
            PartKind::ZeroOrMore(inner) => Self {
                label: "zero-or-more".to_string(),
                children: vec![Self::from_part(inner)],
            },
            PartKind::OneOrMore(inner) => Self {
                label: "one-or-more".to_string(),
                children: vec![Self::from_part(inner)],
            },
            PartKind::Group(parts) => Self {
                label: "group".to_string(),
                children: parts.iter().map(Self::from_part).collect(),
            },
        }
    }
}

impl TreeItem for PartTreeNode {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<[Self::Child]> {
        std::borrow::Cow::from(&self.children)
    }
}
