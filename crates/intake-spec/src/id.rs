use std::fmt;
use std::str::FromStr;

use crate::error::IntakeError;

/// One `kk:value` segment of a layout id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Section(usize),
    Screen(usize),
    Question(usize),
    Template(String),
}

impl Segment {
    fn prefix(&self) -> &'static str {
        match self {
            Segment::Section(_) => "se",
            Segment::Screen(_) => "sc",
            Segment::Question(_) => "qu",
            Segment::Template(_) => "te",
        }
    }

    /// Whether `next` may directly follow this segment.
    fn accepts(&self, next: &Segment) -> bool {
        matches!(
            (self, next),
            (Segment::Section(_), Segment::Screen(_))
                | (Segment::Screen(_), Segment::Question(_))
                | (Segment::Question(_), Segment::Template(_))
                | (Segment::Template(_), Segment::Screen(_))
        )
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Section(n) | Segment::Screen(n) | Segment::Question(n) => {
                write!(f, "{}:{n}", self.prefix())
            }
            Segment::Template(value) => write!(f, "te:{value}"),
        }
    }
}

/// Hierarchical address of a node, e.g. `se:0|sc:2|qu:1|te:3340123|sc:0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId {
    segments: Vec<Segment>,
}

impl LayoutId {
    pub fn section(index: usize) -> Self {
        Self {
            segments: vec![Segment::Section(index)],
        }
    }

    pub fn screen(&self, index: usize) -> Self {
        self.push(Segment::Screen(index))
    }

    pub fn question(&self, index: usize) -> Self {
        self.push(Segment::Question(index))
    }

    pub fn template(&self, hash: u32) -> Self {
        self.push(Segment::Template(hash.to_string()))
    }

    fn push(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Index of the owning section.
    pub fn section_index(&self) -> usize {
        match self.segments.first() {
            Some(Segment::Section(index)) => *index,
            _ => 0,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, IntakeError> {
        let invalid = || IntakeError::InvalidLayoutId(raw.to_string());
        let mut segments: Vec<Segment> = Vec::new();
        for part in raw.split('|') {
            let (prefix, value) = part.split_once(':').ok_or_else(invalid)?;
            let segment = match prefix {
                "se" => Segment::Section(parse_index(value).ok_or_else(invalid)?),
                "sc" => Segment::Screen(parse_index(value).ok_or_else(invalid)?),
                "qu" => Segment::Question(parse_index(value).ok_or_else(invalid)?),
                "te" if !value.is_empty() => Segment::Template(value.to_string()),
                _ => return Err(invalid()),
            };
            match segments.last() {
                None if !matches!(segment, Segment::Section(_)) => return Err(invalid()),
                Some(previous) if !previous.accepts(&segment) => return Err(invalid()),
                _ => {}
            }
            segments.push(segment);
        }
        Ok(Self { segments })
    }
}

fn parse_index(value: &str) -> Option<usize> {
    let canonical = value == "0" || (!value.starts_with('0') && !value.is_empty());
    if !canonical || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str("|")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for LayoutId {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayoutId::parse(s)
    }
}

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub fn fnv32a(input: &str) -> u32 {
    input.bytes().fold(FNV32_OFFSET, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV32_PRIME)
    })
}

/// Key under which a selection's subscreens are stored on its container question.
pub fn subscreen_hash(potential_answer_id: &str, text: &str) -> u32 {
    fnv32a(&format!("{potential_answer_id}|{text}"))
}
