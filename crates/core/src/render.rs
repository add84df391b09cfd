//! Board artifact rendering: marker geometry and the layout-file renderer.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::board::FINAL_SQUARE;

/// Opaque handle to a rendered board, e.g. a file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef(pub String);

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Presentation collaborator that turns player positions into a shared
/// board artifact keyed by session id.
pub trait BoardRenderer: Send + Sync {
    /// Draw `markers` (`(seat, position)`) and return the artifact handle.
    fn render(&self, session_id: &str, markers: &[(usize, u8)]) -> Result<ArtifactRef>;
    /// Whether an artifact is currently held for `session_id`.
    fn exists(&self, session_id: &str) -> bool;
    /// Drop the artifact for `session_id`; missing artifacts are not an error.
    fn release(&self, session_id: &str) -> Result<()>;
    /// Drop every artifact, returning how many were removed.
    fn purge(&self) -> Result<usize>;
}

/// Pixel geometry of the 500x500 board image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardGeometry {
    /// Top-left corner of square 1.
    pub first_square: (u32, u32),
    /// Horizontal coordinate of square 10.
    pub row_end_x: u32,
    /// Distance between neighbouring squares, in both axes.
    pub step: u32,
    /// Edge length of a player marker.
    pub marker_size: u32,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            first_square: (31, 442),
            row_end_x: 441,
            step: 45,
            marker_size: 20,
        }
    }
}

impl BoardGeometry {
    /// Pixel at which to paste a marker for `position`. Rows alternate
    /// direction; square 0 is off the board and has no pixel.
    pub fn marker_origin(&self, position: u8) -> Option<(u32, u32)> {
        if position == 0 || position > FINAL_SQUARE {
            return None;
        }
        let diff = u32::from(position - 1);
        let col = diff % 10;
        let row = diff / 10;
        let (start_x, start_y) = self.first_square;
        let x = if row % 2 == 0 {
            start_x + col * self.step
        } else {
            self.row_end_x - col * self.step
        };
        Some((x, start_y - row * self.step))
    }
}

/// One marker pasted onto the board.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerPlacement {
    pub seat: usize,
    pub position: u8,
    pub sprite: String,
    pub x: u32,
    pub y: u32,
}

/// Serialized description of a board: base image plus marker placements.
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardLayout {
    pub session_id: String,
    pub base_image: String,
    pub marker_size: u32,
    pub markers: Vec<MarkerPlacement>,
    pub rendered_at: DateTime<Utc>,
}

impl BoardLayout {
    /// Lay out `markers` using `geometry`; players still on square 0 are skipped.
    pub fn build(session_id: &str, geometry: &BoardGeometry, markers: &[(usize, u8)]) -> Self {
        let markers = markers
            .iter()
            .filter_map(|&(seat, position)| {
                geometry
                    .marker_origin(position)
                    .map(|(x, y)| MarkerPlacement {
                        seat,
                        position,
                        sprite: format!("player{seat}.png"),
                        x,
                        y,
                    })
            })
            .collect();
        Self {
            session_id: session_id.to_string(),
            base_image: BLANK_BOARD.to_string(),
            marker_size: geometry.marker_size,
            markers,
            rendered_at: Utc::now(),
        }
    }

    /// Load a layout previously written by [`LayoutRenderer`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read board layout {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse board layout {}", path.display()))
    }
}

const BLANK_BOARD: &str = "blank_board.png";
const LAYOUT_EXTENSION: &str = "json";

/// Writes one JSON layout per session under a boards directory.
#[derive(Debug, Clone)]
pub struct LayoutRenderer {
    root: PathBuf,
    geometry: BoardGeometry,
}

impl LayoutRenderer {
    /// Renderer writing into `root` with the stock board geometry.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            geometry: BoardGeometry::default(),
        }
    }

    /// Directory holding the layout files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the layout file for `session_id`.
    pub fn layout_path(&self, session_id: &str) -> PathBuf {
        self.root.join(format!(
            "{}.{LAYOUT_EXTENSION}",
            sanitize_component(session_id)
        ))
    }
}

impl BoardRenderer for LayoutRenderer {
    fn render(&self, session_id: &str, markers: &[(usize, u8)]) -> Result<ArtifactRef> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let layout = BoardLayout::build(session_id, &self.geometry, markers);
        let path = self.layout_path(session_id);
        let serialized =
            serde_json::to_vec_pretty(&layout).context("failed to serialize board layout")?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(session = session_id, path = %path.display(), markers = layout.markers.len(), "Board rendered");
        Ok(ArtifactRef(path.display().to_string()))
    }

    fn exists(&self, session_id: &str) -> bool {
        self.layout_path(session_id).is_file()
    }

    fn release(&self, session_id: &str) -> Result<()> {
        let path = self.layout_path(session_id);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))
    }

    fn purge(&self) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&self.root).context("failed to read boards directory")? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some(LAYOUT_EXTENSION) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(err) => warn!("Failed to remove stale board {:?}: {err}", entry.path()),
            }
        }
        Ok(removed)
    }
}

/// File-safe key for a session id. ASCII letters, digits and `-` pass
/// through; every other byte, `_` included, becomes `_xx` hex, so distinct
/// ids never share a file.
fn sanitize_component(input: &str) -> String {
    if input.is_empty() {
        return "_".to_string();
    }
    let mut result = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            result.push(char::from(byte));
        } else {
            result.push_str(&format!("_{byte:02x}"));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn markers_follow_the_serpentine() {
        let geometry = BoardGeometry::default();
        assert_eq!(geometry.marker_origin(0), None);
        assert_eq!(geometry.marker_origin(1), Some((31, 442)));
        assert_eq!(geometry.marker_origin(10), Some((436, 442)));
        assert_eq!(geometry.marker_origin(11), Some((441, 397)));
        assert_eq!(geometry.marker_origin(20), Some((36, 397)));
        assert_eq!(geometry.marker_origin(21), Some((31, 352)));
        assert_eq!(geometry.marker_origin(100), Some((36, 37)));
    }

    #[test]
    fn layout_skips_players_off_the_board() {
        let layout = BoardLayout::build("room", &BoardGeometry::default(), &[(1, 0), (2, 11)]);
        assert_eq!(layout.markers.len(), 1);
        let marker = &layout.markers[0];
        assert_eq!(marker.seat, 2);
        assert_eq!(marker.sprite, "player2.png");
        assert_eq!((marker.x, marker.y), (441, 397));
    }

    #[test]
    fn render_release_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let renderer = LayoutRenderer::new(dir.path().join("boards"));
        assert!(!renderer.exists("room-1"));

        let artifact = renderer.render("room-1", &[(1, 38), (2, 0)])?;
        assert!(renderer.exists("room-1"));
        let layout = BoardLayout::load(&artifact.0)?;
        assert_eq!(layout.session_id, "room-1");
        assert_eq!(layout.markers.len(), 1);
        assert_eq!(layout.markers[0].position, 38);

        renderer.release("room-1")?;
        assert!(!renderer.exists("room-1"));
        renderer.release("room-1")?;
        Ok(())
    }

    #[test]
    fn purge_removes_only_layouts() -> Result<()> {
        let dir = tempdir()?;
        let renderer = LayoutRenderer::new(dir.path());
        renderer.render("a", &[])?;
        renderer.render("b", &[])?;
        fs::write(dir.path().join("notes.txt"), "keep me")?;

        assert_eq!(renderer.purge()?, 2);
        assert!(dir.path().join("notes.txt").exists());
        assert!(!renderer.exists("a"));
        Ok(())
    }

    #[test]
    fn session_ids_become_safe_file_names() {
        assert_eq!(sanitize_component("chan-42"), "chan-42");
        assert_eq!(sanitize_component("../chan 42!"), "_2e_2e_2fchan_2042_21");
        assert_eq!(sanitize_component("a_b"), "a_5fb");
        assert_eq!(sanitize_component(""), "_");
    }

    #[test]
    fn similar_ids_get_separate_layouts() -> Result<()> {
        let dir = tempdir()?;
        let renderer = LayoutRenderer::new(dir.path());
        let ids = ["chan 42", "chan42", "chan_42", "chan_5f42", "chan/42"];
        let paths: HashSet<_> = ids.iter().map(|id| renderer.layout_path(id)).collect();
        assert_eq!(paths.len(), ids.len());

        renderer.render("chan 42", &[])?;
        assert!(!renderer.exists("chan42"));
        renderer.release("chan42")?;
        assert!(renderer.exists("chan 42"));
        Ok(())
    }
}
