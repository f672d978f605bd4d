use airdash::{pacing::Context, panel::Panel, settings::Settings};

fn main() {
    tracing_subscriber::fmt::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    let ctx = Context::new();
    {
        let ctx = ctx.clone();
        ctrlc::set_handler(move || {
            tracing::info!("got SIGINT, closing context");
            ctx.cancel();
        })
        .expect("could not set SIGINT handler");
    }

    #[cfg(feature = "simulator")]
    let surface = airdash::simulator::SimSurface::new("airdash", settings.panel_size(), ctx.clone());

    #[cfg(not(feature = "simulator"))]
    let surface = {
        tracing::info!("no window; saving frames to {}", settings.frame_path.display());
        airdash::simulator::SimSurface::headless(settings.panel_size(), &settings.frame_path)
    };

    let panel = Panel::new(surface, settings.cell_size());
    if let Err(e) = airdash::run(&settings, panel, &ctx) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
    ctx.cancel();

    tracing::info!("shut down");
}
