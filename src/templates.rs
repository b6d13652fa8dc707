use std::sync::OnceLock;
use tera::Tera;

static TERA: OnceLock<Tera> = OnceLock::new();

const BUILTIN: &[(&str, &str)] = &[(
    "certificate_setup.html",
    include_str!("../templates/certificate_setup.html"),
)];

/// Built-in pages, overridden by same-named files in `./templates`.
pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        if let Err(e) = tera.add_raw_templates(BUILTIN.iter().copied()) {
            tracing::error!("Built-in templates failed to parse: {}", e);
        }

        let template_dir = std::path::Path::new("templates");
        if let Ok(entries) = std::fs::read_dir(template_dir) {
            let files: Vec<_> = entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().map_or(false, |ext| ext == "html"))
                .filter_map(|p| {
                    let name = p.file_name()?.to_str()?.to_string();
                    Some((p, Some(name)))
                })
                .collect();
            if let Err(e) = tera.add_template_files(files) {
                tracing::error!("Failed to load templates from {}: {}", template_dir.display(), e);
            }
        }
        tera
    })
}
