//! Reset of deeper levels when the user edits a level.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::models::wilayah::Level;
use crate::selector::Inner;
use crate::selector::form::{FormField, normalize};
use crate::selector::store::fetch_level;

/// Applies a user edit at `level`.
///
/// Selection and option lists of every deeper level are cleared together
/// with the derived kode pos, then the child level is fetched in the
/// background for the new code. Returns the handle of that fetch, if one
/// was started.
pub(crate) fn on_user_change(
    inner: &Arc<Inner>,
    level: Level,
    new_code: Option<String>,
) -> Option<JoinHandle<()>> {
    if !inner.visible.is_visible(level) {
        log::warn!("Perubahan {} diabaikan: tingkat tidak ditampilkan", level);
        return None;
    }

    let code = normalize(new_code);
    inner.form.set_value(level.into(), code.clone());

    {
        let mut store = inner.store();
        for deeper in level.descendants() {
            inner.form.set_value(deeper.into(), None);
            store.clear(deeper);
        }
    }

    let kode_pos = match (level, code.as_deref()) {
        (Level::Desa, Some(desa)) => inner
            .store()
            .find(Level::Desa, desa)
            .and_then(|item| item.postal_code.clone()),
        _ => None,
    };
    inner.form.set_value(FormField::KodePos, kode_pos);

    let child = level.child().filter(|c| inner.visible.is_visible(*c))?;
    let parent = code?;
    inner.store().begin(child, Some(&parent));
    let inner = Arc::clone(inner);
    Some(tokio::spawn(async move {
        // failures are already notified
        let _ = fetch_level(&inner, child, Some(&parent)).await;
    }))
}
