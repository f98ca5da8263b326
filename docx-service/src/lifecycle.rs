//! The editor lifecycle manager (§4.6): turns a loaded engine into an
//! `(editor, cleanup)` pair. Cleanup is idempotent and synchronous, and runs
//! automatically on drop so a handler that returns early (an error, a
//! timeout) still releases the engine's in-memory state exactly once.
//!
//! Construction failure never leaves a live engine behind: `EditorGuard::open`
//! only produces a guard once `DocxEngine::load` has already succeeded, so a
//! failed load has nothing for this layer to release — the engine
//! implementation is responsible for cleaning up whatever it partially built
//! before returning `Err`.

use docx_core::{DocxEngine, EditorMode, EngineError};

pub struct EditorGuard<E: DocxEngine> {
    editor: Option<E>,
}

impl<E: DocxEngine> EditorGuard<E> {
    pub fn open(buffer: &[u8], mode: EditorMode) -> Result<Self, EngineError> {
        let editor = E::load(buffer, mode)?;
        Ok(Self { editor: Some(editor) })
    }

    pub fn get_mut(&mut self) -> &mut E {
        self.editor.as_mut().expect("EditorGuard used after cleanup")
    }

    pub fn get(&self) -> &E {
        self.editor.as_ref().expect("EditorGuard used after cleanup")
    }

    /// Release the engine's in-memory state. Safe to call more than once;
    /// only the first call does anything.
    pub fn cleanup(&mut self) {
        if let Some(mut editor) = self.editor.take() {
            editor.destroy();
        }
    }
}

impl<E: DocxEngine> Drop for EditorGuard<E> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_core::engine::memory::{build_fixture, MemoryEngine};

    #[test]
    fn open_succeeds_on_a_well_formed_buffer() {
        let buffer = build_fixture(&["hello", "world"]);
        let guard = EditorGuard::<MemoryEngine>::open(&buffer, EditorMode::Editing).unwrap();
        assert_eq!(guard.get().traverse().len(), 2);
    }

    #[test]
    fn open_fails_on_garbage() {
        let err = EditorGuard::<MemoryEngine>::open(b"not a zip", EditorMode::Editing).unwrap_err();
        assert!(matches!(err, EngineError::LoadFailed(_)));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let buffer = build_fixture(&["hello"]);
        let mut guard = EditorGuard::<MemoryEngine>::open(&buffer, EditorMode::Editing).unwrap();
        guard.cleanup();
        guard.cleanup();
    }

    #[test]
    #[should_panic(expected = "used after cleanup")]
    fn using_a_cleaned_up_guard_panics() {
        let buffer = build_fixture(&["hello"]);
        let mut guard = EditorGuard::<MemoryEngine>::open(&buffer, EditorMode::Editing).unwrap();
        guard.cleanup();
        guard.get_mut();
    }
}
