use tracing::debug;

use crate::engine::Engine;
use crate::node::{NodeKey, NodeKind};
use crate::render::{ButtonMessage, OverviewSection, VisitOverviewScreen};
use crate::wire::{EnabledState, FilledState, SectionStatusData, VisitStatusData};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SectionState {
    #[default]
    Undefined,
    Complete,
    Incomplete,
}

impl From<SectionState> for FilledState {
    fn from(state: SectionState) -> Self {
        match state {
            SectionState::Undefined => FilledState::FilledStateUndefined,
            SectionState::Complete => FilledState::Filled,
            SectionState::Incomplete => FilledState::Unfilled,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SectionStatus {
    pub current: SectionState,
    /// State at the last overview emission.
    pub last_shown: SectionState,
    /// First visible screen of the section.
    pub resume_screen: Option<NodeKey>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionStatus {
    pub sections: Vec<SectionStatus>,
    /// Index of the first incomplete section; the section count once all are complete.
    pub resume_section_index: usize,
    pub resume_screen: Option<NodeKey>,
}

impl Engine {
    pub(crate) fn refresh_status(&mut self) {
        let count = self.tree.sections.len();
        let mut sections = Vec::with_capacity(count);
        let mut resume_section_index = count;
        let mut resume_screen = None;
        for index in 0..count {
            let first_visible = self.tree.section_screens[index]
                .iter()
                .copied()
                .find(|key| self.tree.arena.get(*key).is_some_and(|n| n.is_visible()));
            let current = if self.section_requirements(index).is_ok() {
                SectionState::Complete
            } else {
                SectionState::Incomplete
            };
            if current == SectionState::Incomplete && resume_section_index == count {
                resume_section_index = index;
                resume_screen = first_visible;
            }
            let last_shown = self
                .status
                .sections
                .get(index)
                .map(|s| s.last_shown)
                .unwrap_or_default();
            sections.push(SectionStatus {
                current,
                last_shown,
                resume_screen: first_visible,
            });
        }
        self.status = CompletionStatus {
            sections,
            resume_section_index,
            resume_screen,
        };
    }

    fn screen_id(&self, key: Option<NodeKey>) -> Option<String> {
        key.and_then(|k| self.tree.arena.get(k))
            .map(|node| node.layout_id.to_string())
    }

    fn section_title(&self, index: usize) -> String {
        match self.tree.sections.get(index).and_then(|k| self.tree.arena.get(*k)).map(|n| &n.kind) {
            Some(NodeKind::Section(section)) => section.title.clone(),
            _ => String::new(),
        }
    }

    /// Read-only snapshot of per-section completion and the resume pointer.
    pub fn compute_status(&self) -> VisitStatusData {
        VisitStatusData {
            sections: self
                .status
                .sections
                .iter()
                .enumerate()
                .map(|(index, section)| SectionStatusData {
                    name: self.section_title(index),
                    filled_state: section.current.into(),
                    resume_screen_id: self.screen_id(section.resume_screen),
                })
                .collect(),
            resume_section_index: self.status.resume_section_index as u32,
            resume_screen_id: self.screen_id(self.status.resume_screen),
        }
    }

    /// Builds the overview and records the states it shows.
    pub(crate) fn overview_screen(&mut self) -> VisitOverviewScreen {
        let resume = self.status.resume_section_index;
        let transition = self.transitions.get(resume);
        let overview = VisitOverviewScreen {
            title: self.header.title.clone(),
            subtitle: self.header.subtitle.clone(),
            icon_url: self.header.icon_url.clone(),
            text: transition.map(|t| t.message.clone()).unwrap_or_default(),
            buttons: transition
                .map(|t| t.buttons.iter().map(ButtonMessage::from).collect())
                .unwrap_or_default(),
            sections: self
                .status
                .sections
                .iter()
                .enumerate()
                .map(|(index, section)| OverviewSection {
                    name: self.section_title(index),
                    current: section.current.into(),
                    previous: section.last_shown.into(),
                    enabled: if index > resume {
                        EnabledState::Disabled
                    } else {
                        EnabledState::Enabled
                    },
                })
                .collect(),
        };
        for section in &mut self.status.sections {
            section.last_shown = section.current;
        }
        debug!(resume_section = resume, "overview emitted");
        overview
    }
}
