use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NodeError;
use crate::serde_value::{default_version, lenient_dimension, lenient_nodes, write_dimension};

/// Minimum number of options a poll needs before it can be saved.
pub const MIN_POLL_OPTIONS: usize = 2;

bitflags::bitflags! {
    /// Inline text formatting, persisted as an integer bit set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextFormat: u32 {
        const BOLD = 1;
        const ITALIC = 1 << 1;
        const STRIKETHROUGH = 1 << 2;
        const UNDERLINE = 1 << 3;
        const CODE = 1 << 4;
        const SUBSCRIPT = 1 << 5;
        const SUPERSCRIPT = 1 << 6;
        const HIGHLIGHT = 1 << 7;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    #[default]
    Normal,
    Token,
    Segmented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

/// Block alignment. Persisted as a string, the empty string meaning unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementFormat {
    #[default]
    #[serde(rename = "")]
    Unset,
    Left,
    Start,
    Center,
    Right,
    End,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Text,
    Paragraph,
    Mention,
    Keyword,
    Equation,
    InlineImage,
    Poll,
    Code,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Text => "text",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Mention => "mention",
            NodeKind::Keyword => "keyword",
            NodeKind::Equation => "equation",
            NodeKind::InlineImage => "inline-image",
            NodeKind::Poll => "poll",
            NodeKind::Code => "code",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub root: RootNode,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(vec![Node::paragraph("")])
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            root: RootNode {
                children,
                ..RootNode::default()
            },
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.root.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.root.children
    }

    /// Checks everything a persisted document must satisfy, including rules
    /// that are deliberately relaxed while editing (poll option count).
    pub fn validate_for_save(&self) -> Result<(), NodeError> {
        fn walk(nodes: &[Node]) -> Result<(), NodeError> {
            for node in nodes {
                node.validate()?;
                if let Node::Poll(poll) = node {
                    if poll.options.len() < MIN_POLL_OPTIONS {
                        return Err(NodeError::TooFewPollOptions {
                            question: poll.question.clone(),
                            min: MIN_POLL_OPTIONS,
                            found: poll.options.len(),
                        });
                    }
                }
                if let Some(children) = node.children() {
                    walk(children)?;
                }
            }
            Ok(())
        }

        walk(&self.root.children)
    }

    /// Removes every node whose kind is rejected by `keep`, together with its
    /// subtree. Returns the number of removed nodes.
    pub fn retain_kinds(&mut self, keep: impl Fn(NodeKind) -> bool) -> usize {
        fn walk(nodes: &mut Vec<Node>, keep: &dyn Fn(NodeKind) -> bool) -> usize {
            let before = nodes.len();
            nodes.retain(|node| {
                let kept = keep(node.kind());
                if !kept {
                    tracing::warn!(kind = %node.kind(), "dropping node of unsupported kind");
                }
                kept
            });
            let mut removed = before - nodes.len();
            for node in nodes.iter_mut() {
                if let Some(children) = node.children_mut() {
                    removed += walk(children, keep);
                }
            }
            removed
        }

        walk(&mut self.root.children, &keep)
    }

    pub fn text_content(&self) -> String {
        self.root
            .children
            .iter()
            .map(Node::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) enum RootTag {
    #[default]
    #[serde(rename = "root")]
    Root,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootNode {
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub children: Vec<Node>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub format: ElementFormat,
    #[serde(default)]
    pub indent: u32,
    #[serde(rename = "type", default)]
    pub(crate) tag: RootTag,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl Default for RootNode {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            direction: None,
            format: ElementFormat::Unset,
            indent: 0,
            tag: RootTag::Root,
            version: default_version(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Node {
    Text(TextNode),
    Paragraph(ParagraphNode),
    Mention(MentionNode),
    Keyword(KeywordNode),
    Equation(EquationNode),
    InlineImage(ImageNode),
    Poll(PollNode),
    Code(CodeNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode::new(text))
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::Paragraph(ParagraphNode::new(vec![Node::text(text)]))
    }

    pub fn paragraph_with(children: Vec<Node>) -> Self {
        Node::Paragraph(ParagraphNode::new(children))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Text(_) => NodeKind::Text,
            Node::Paragraph(_) => NodeKind::Paragraph,
            Node::Mention(_) => NodeKind::Mention,
            Node::Keyword(_) => NodeKind::Keyword,
            Node::Equation(_) => NodeKind::Equation,
            Node::InlineImage(_) => NodeKind::InlineImage,
            Node::Poll(_) => NodeKind::Poll,
            Node::Code(_) => NodeKind::Code,
        }
    }

    pub fn role(&self) -> NodeRole {
        match self {
            Node::Paragraph(_) | Node::Code(_) | Node::Poll(_) => NodeRole::Block,
            Node::Text(_)
            | Node::Mention(_)
            | Node::Keyword(_)
            | Node::Equation(_)
            | Node::InlineImage(_) => NodeRole::Inline,
        }
    }

    pub fn is_block(&self) -> bool {
        self.role() == NodeRole::Block
    }

    /// Blocks whose children are inline content the caret can move through.
    pub fn is_text_block(&self) -> bool {
        matches!(self, Node::Paragraph(_) | Node::Code(_))
    }

    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Paragraph(p) => Some(&p.children),
            Node::Code(c) => Some(&c.children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Paragraph(p) => Some(&mut p.children),
            Node::Code(c) => Some(&mut c.children),
            _ => None,
        }
    }

    /// Width of the node in block-level offsets. Atomic inline nodes that
    /// carry text count their text; other atomics count as one unit.
    pub fn inline_len(&self) -> usize {
        match self {
            Node::Text(t) => t.text.len(),
            Node::Mention(m) => m.text.len(),
            Node::Keyword(k) => k.text.len(),
            Node::Equation(_) | Node::InlineImage(_) => 1,
            Node::Paragraph(_) | Node::Code(_) | Node::Poll(_) => 0,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.text.clone(),
            Node::Mention(m) => m.text.clone(),
            Node::Keyword(k) => k.text.clone(),
            Node::Equation(e) => e.equation.clone(),
            Node::InlineImage(i) => i.alt_text.clone(),
            Node::Poll(p) => p.question.clone(),
            Node::Paragraph(_) | Node::Code(_) => self
                .children()
                .unwrap_or_default()
                .iter()
                .map(Node::text_content)
                .collect(),
        }
    }

    /// Field-level validation of this node alone (children are not visited).
    pub fn validate(&self) -> Result<(), NodeError> {
        match self {
            Node::Mention(m) if m.mention_name.trim().is_empty() => Err(NodeError::EmptyMention),
            Node::Keyword(k) if k.text.is_empty() => Err(NodeError::EmptyKeyword),
            Node::Equation(e) if e.equation.trim().is_empty() => Err(NodeError::EmptyEquation),
            Node::InlineImage(i) if i.src.trim().is_empty() => Err(NodeError::EmptyImageSource),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub format: TextFormat,
    #[serde(default)]
    pub detail: u32,
    #[serde(default)]
    pub mode: TextMode,
    #[serde(default)]
    pub style: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::empty(),
            detail: 0,
            mode: TextMode::Normal,
            style: String::new(),
            version: default_version(),
        }
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// A text node with the same formatting but different content.
    pub fn sibling(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    pub fn same_formatting(&self, other: &TextNode) -> bool {
        self.format == other.format
            && self.style == other.style
            && self.mode == other.mode
            && self.detail == other.detail
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphNode {
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub children: Vec<Node>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub format: ElementFormat,
    #[serde(default)]
    pub indent: u32,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl ParagraphNode {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            direction: None,
            format: ElementFormat::Unset,
            indent: 0,
            version: default_version(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionNode {
    #[serde(rename = "mentionName")]
    pub mention_name: String,
    pub text: String,
    #[serde(default)]
    pub format: TextFormat,
    #[serde(default)]
    pub style: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl MentionNode {
    pub fn new(mention_name: impl Into<String>) -> Result<Self, NodeError> {
        let mention_name = mention_name.into();
        if mention_name.trim().is_empty() {
            return Err(NodeError::EmptyMention);
        }
        Ok(Self {
            text: mention_name.clone(),
            mention_name,
            format: TextFormat::empty(),
            style: String::new(),
            version: default_version(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordNode {
    pub text: String,
    #[serde(default)]
    pub format: TextFormat,
    #[serde(default)]
    pub style: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl KeywordNode {
    pub fn new(text: impl Into<String>) -> Result<Self, NodeError> {
        let text = text.into();
        if text.is_empty() {
            return Err(NodeError::EmptyKeyword);
        }
        Ok(Self {
            text,
            format: TextFormat::empty(),
            style: String::new(),
            version: default_version(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationNode {
    pub equation: String,
    #[serde(default)]
    pub inline: bool,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl EquationNode {
    pub fn new(equation: impl Into<String>, inline: bool) -> Result<Self, NodeError> {
        let equation = equation.into();
        if equation.trim().is_empty() {
            return Err(NodeError::EmptyEquation);
        }
        Ok(Self {
            equation,
            inline,
            version: default_version(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageNode {
    pub src: String,
    #[serde(rename = "altText", default)]
    pub alt_text: String,
    #[serde(
        default,
        serialize_with = "write_dimension",
        deserialize_with = "lenient_dimension"
    )]
    pub width: Option<u32>,
    #[serde(
        default,
        serialize_with = "write_dimension",
        deserialize_with = "lenient_dimension"
    )]
    pub height: Option<u32>,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl ImageNode {
    pub fn new(src: impl Into<String>, alt_text: impl Into<String>) -> Result<Self, NodeError> {
        let src = src.into();
        if src.trim().is_empty() {
            return Err(NodeError::EmptyImageSource);
        }
        Ok(Self {
            src,
            alt_text: alt_text.into(),
            width: None,
            height: None,
            version: default_version(),
        })
    }

    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollNode {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl PollNode {
    pub fn new(question: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            question: question.into(),
            options,
            version: default_version(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeNode {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub children: Vec<Node>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub format: ElementFormat,
    #[serde(default)]
    pub indent: u32,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl CodeNode {
    pub fn new(language: Option<String>, children: Vec<Node>) -> Self {
        Self {
            language,
            children,
            direction: None,
            format: ElementFormat::Unset,
            indent: 0,
            version: default_version(),
        }
    }
}
