use glob::glob;
use shadert_preprocess::ShaderSource;

#[test]
fn load_all_fixture_shaders() {
    for entry in glob("../test/**/*.*").unwrap() {
        let Ok(path) = entry else { continue };
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if ext.parse::<shadert_common::ShaderStage>().is_err() {
            continue;
        }

        ShaderSource::load(&path, &[]).unwrap_or_else(|e| {
            panic!("Failed to load shader {}: {e}", path.display())
        });
    }
}
