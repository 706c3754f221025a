use std::path::PathBuf;

use anyhow::{bail, Context};
use layerkit::ExportFormat;

fn main() -> anyhow::Result<()> {
    layerkit::logging::init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let Some(output) = args.next() else {
        bail!("usage: layerkit <output.png|jpg|webp> <image>...");
    };
    let format = output
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(ExportFormat::from_extension)
        .with_context(|| format!("unsupported output type: {}", output.display()))?;

    let mut images = Vec::new();
    for path in args {
        let image = image::open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .to_rgba8();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Layer".to_string());
        images.push((name, image));
    }

    let Some(bytes) = layerkit::flatten_images(images, format)? else {
        bail!("nothing to export; pass at least one image");
    };
    std::fs::write(&output, &bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(path = %output.display(), bytes = bytes.len(), "export written");
    Ok(())
}
