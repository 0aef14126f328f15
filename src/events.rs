use crate::mesh::MeshKey;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    ModelInserted { index: usize, name: String },
    ModelRemoved { index: usize },
    ActiveModelChanged { index: Option<usize> },
    SelectionChanged { mesh: Option<MeshKey> },
    TextureApplied { mesh: MeshKey, texture: Option<String> },
    TilingChanged { factor: f32 },
    EnvironmentChanged { name: Option<String> },
    /// User-visible failure; the UI shows it as a blocking notice.
    Notice { message: String },
}

impl fmt::Display for ViewerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerEvent::ModelInserted { index, name } => write!(f, "ModelInserted index={index} name={name}"),
            ViewerEvent::ModelRemoved { index } => write!(f, "ModelRemoved index={index}"),
            ViewerEvent::ActiveModelChanged { index } => write!(f, "ActiveModelChanged index={index:?}"),
            ViewerEvent::SelectionChanged { mesh: Some(mesh) } => write!(f, "SelectionChanged mesh={mesh}"),
            ViewerEvent::SelectionChanged { mesh: None } => write!(f, "SelectionChanged mesh=none"),
            ViewerEvent::TextureApplied { mesh, texture } => {
                write!(f, "TextureApplied mesh={mesh} texture={}", texture.as_deref().unwrap_or("default"))
            }
            ViewerEvent::TilingChanged { factor } => write!(f, "TilingChanged factor={factor:.2}"),
            ViewerEvent::EnvironmentChanged { name } => {
                write!(f, "EnvironmentChanged name={}", name.as_deref().unwrap_or("none"))
            }
            ViewerEvent::Notice { message } => write!(f, "Notice {message}"),
        }
    }
}

/// Observable channel for state several independent consumers care about
/// (UI controls, outline list, mesh list). Drained once per frame.
#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<ViewerEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: ViewerEvent) {
        log::debug!("[event] {event}");
        self.events.push(event);
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.push(ViewerEvent::Notice { message: message.into() });
    }

    pub fn drain(&mut self) -> Vec<ViewerEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
