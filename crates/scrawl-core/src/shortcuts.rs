//! Keyboard shortcut registry.

use crate::canvas::{CanvasAction, CanvasState};
use crate::engine::Command;
use crate::history::HistoryAction;
use crate::tools::ToolType;

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Tool(ToolType),
    SelectAll,
    Copy,
    Paste,
    DuplicateSelection,
    DeleteSelection,
    Undo,
    Redo,
}

impl Binding {
    /// Command for this binding against the current state.
    ///
    /// Selection-based bindings yield nothing when the selection is empty.
    pub fn to_command(self, state: &CanvasState) -> Option<Command> {
        let selected = || -> Option<Vec<String>> {
            let ids: Vec<String> = state.selected_nodes().iter().map(|n| n.node_props.id.clone()).collect();
            (!ids.is_empty()).then_some(ids)
        };
        let command: Command = match self {
            Binding::Tool(tool) => CanvasAction::SetToolType(tool).into(),
            Binding::SelectAll => CanvasAction::SelectAllNodes.into(),
            Binding::Copy => CanvasAction::CopyNodes.into(),
            Binding::Paste => CanvasAction::PasteNodes.into(),
            Binding::DuplicateSelection => CanvasAction::DuplicateNodes(selected()?).into(),
            Binding::DeleteSelection => CanvasAction::DeleteNodes(selected()?).into(),
            Binding::Undo => HistoryAction::Undo.into(),
            Binding::Redo => HistoryAction::Redo.into(),
        };
        Some(command)
    }
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub description: &'static str,
    pub binding: Binding,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        ctrl: bool,
        shift: bool,
        description: &'static str,
        binding: Binding,
    ) -> Self {
        Self {
            key,
            ctrl,
            shift,
            description,
            binding,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    fn matches(&self, key: &str, ctrl: bool, shift: bool) -> bool {
        self.ctrl == ctrl && self.shift == shift && self.key.eq_ignore_ascii_case(key)
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("V", false, false, "Select tool", Binding::Tool(ToolType::Select)),
            Shortcut::new("H", false, false, "Hand tool", Binding::Tool(ToolType::Hand)),
            Shortcut::new("R", false, false, "Rectangle tool", Binding::Tool(ToolType::Rectangle)),
            Shortcut::new("O", false, false, "Ellipse tool", Binding::Tool(ToolType::Ellipse)),
            Shortcut::new("A", false, false, "Arrow tool", Binding::Tool(ToolType::Arrow)),
            Shortcut::new("P", false, false, "Draw tool", Binding::Tool(ToolType::Draw)),
            Shortcut::new("T", false, false, "Text tool", Binding::Tool(ToolType::Text)),
            Shortcut::new("A", true, false, "Select all shapes", Binding::SelectAll),
            Shortcut::new("C", true, false, "Copy shapes", Binding::Copy),
            Shortcut::new("V", true, false, "Paste shapes", Binding::Paste),
            Shortcut::new("D", true, false, "Duplicate selected shapes", Binding::DuplicateSelection),
            Shortcut::new("Delete", false, false, "Delete selected shapes", Binding::DeleteSelection),
            Shortcut::new("Backspace", false, false, "Delete selected shapes", Binding::DeleteSelection),
            Shortcut::new("Z", true, false, "Undo", Binding::Undo),
            Shortcut::new("Z", true, true, "Redo", Binding::Redo),
            Shortcut::new("Y", true, false, "Redo", Binding::Redo),
        ]
    }

    /// Find the binding for a key press. Key names are case-insensitive.
    pub fn lookup(key: &str, ctrl: bool, shift: bool) -> Option<Binding> {
        Self::all()
            .into_iter()
            .find(|shortcut| shortcut.matches(key, ctrl, shift))
            .map(|shortcut| shortcut.binding)
    }

    /// Resolve a key press straight to a command.
    pub fn command_for(key: &str, ctrl: bool, shift: bool, state: &CanvasState) -> Option<Command> {
        Self::lookup(key, ctrl, shift)?.to_command(state)
    }
}
