use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::FileAccessError;

pub fn build_file_context<P: AsRef<Path>>(paths: &[P]) -> Result<String, FileAccessError> {
    let mut context = String::new();

    for path in paths {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| FileAccessError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %path.display(),
            content_len = content.len(),
            "read context file"
        );

        context.push_str(&format!("\n--- {} ---\n", path.display()));
        context.push_str(&content);
    }

    Ok(context)
}
