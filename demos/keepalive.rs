use keepalive::{config::Config, Scheduler};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let config = match std::env::var("KEEPALIVE_CONFIG") {
        Ok(path) => Config::load(&path)
            .await
            .map_err(|err| {
                log::error!("Load config failed: {}", err);
                std::process::exit(1);
            })
            .unwrap(),
        Err(_) => Config::default(),
    };

    let scheduler = Scheduler::from_config(&config)
        .map_err(|err| {
            log::error!("{}", err);
            std::process::exit(1);
        })
        .unwrap();

    log::info!("Starting multi account keepalive");

    tokio::select! {
        result = scheduler.run() => {
            if let Err(err) = result {
                log::error!("{}", err);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Program terminated by user");
        }
    }
}
