//! Check that every model the dashboard can show loads from the asset root.
//!
//! Reads the same settings as the dashboard; exits nonzero if any model is missing or empty.

use airdash::assets::{AssetKey, AssetLibrary};
use airdash::settings::Settings;

fn main() {
    tracing_subscriber::fmt::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    let mut library = AssetLibrary::new(&settings.asset_root);
    let mut failed = 0;
    for key in AssetKey::ALL {
        match library.load(key) {
            Ok(geometry) => {
                let (min, max) = geometry.bounds();
                tracing::info!(
                    "{}: {} triangles, bounds {:?} to {:?}",
                    key,
                    geometry.triangles().count(),
                    min,
                    max
                );
            }
            Err(e) => {
                tracing::error!("{}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        tracing::error!("{} of {} models failed to load", failed, AssetKey::ALL.len());
        std::process::exit(1);
    }
    println!("all {} models loaded from {}", library.cached(), library.root().display());
}
