//! Native extension modules.
//!
//! A shared library becomes an extension by exporting `extern "C"` entry
//! points under fixed, unmangled names (`Init`, `Count`, `ParseWidget`, ...)
//! with the signatures in [`abi`](super::abi). The
//! [`export_extension!`](crate::export_extension) macro produces those
//! exports. Symbols are looked up once when the library is opened.

use std::path::{Path, PathBuf};

use libloading::Library;

use super::abi::NativeEntries;
use crate::error::{GuiError, Result};

/// An open shared library backing an extension.
pub struct ExtensionLibrary {
    path: PathBuf,
    // Kept alive for as long as the resolved function pointers are used.
    _library: Library,
}

impl ExtensionLibrary {
    /// Open `path` and resolve every known entry point.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, NativeEntries)> {
        let path = path.into();
        log::debug!("Opening extension library {:?}", path);

        // SAFETY: loading a library runs its initializers. Extension modules
        // are trusted code built against this crate.
        let library = unsafe { Library::new(&path) }.map_err(|source| GuiError::Library {
            path: path.clone(),
            source,
        })?;

        let entries = unsafe { resolve(&library) };

        Ok((
            Self {
                path,
                _library: library,
            },
            entries,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Look up one exported function pointer, `None` when the symbol is absent.
///
/// # Safety
///
/// `T` must be the `extern "C"` function pointer type the symbol was exported
/// with.
unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Option<T> {
    library.get::<T>(name).ok().map(|symbol| *symbol)
}

unsafe fn resolve(library: &Library) -> NativeEntries {
    NativeEntries {
        init: symbol(library, b"Init\0"),
        count: symbol(library, b"Count\0"),
        measure: symbol(library, b"Measure\0"),
        parse_layout: symbol(library, b"ParseLayout\0"),
        parse_widget: symbol(library, b"ParseWidget\0"),
        build_layout: symbol(library, b"BuildLayout\0"),
        build_widget: symbol(library, b"BuildWidget\0"),
        build_children: symbol(library, b"BuildChildren\0"),
        destroy: symbol(library, b"Destroy\0"),
        on_enter: symbol(library, b"OnEnter\0"),
        on_exit: symbol(library, b"OnExit\0"),
        on_click: symbol(library, b"OnClick\0"),
        on_release_inside: symbol(library, b"OnReleaseInside\0"),
        on_release_outside: symbol(library, b"OnReleaseOutside\0"),
        on_scroll: symbol(library, b"OnScroll\0"),
        on_update: symbol(library, b"OnUpdate\0"),
        on_popup_closed: symbol(library, b"OnPopupClosed\0"),
        on_child_clicked: symbol(library, b"OnChildClicked\0"),
        on_child_released: symbol(library, b"OnChildReleased\0"),
        on_child_update: symbol(library, b"OnChildUpdate\0"),
        query_number: symbol(library, b"QueryNumber\0"),
        query_string: symbol(library, b"QueryString\0"),
        set_number: symbol(library, b"SetNumber\0"),
        set_string: symbol(library, b"SetString\0"),
    }
}
