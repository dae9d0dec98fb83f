use tracing::{error, info};
use tracing_subscriber;

use clap::{values_t, App, Arg};

use zfx_gossip::server::{node, Overrides, Settings};
use zfx_gossip::Result;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_level(false)
        .with_target(false)
        .without_time()
        .compact()
        .with_max_level(tracing::Level::INFO)
        .init();

    let matches = App::new("zfx-gossip")
        .version("0.1")
        .author("zero.fx labs ltd.")
        .about("Runs a gossip node")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("CONFIG_FILE")
                .takes_value(true),
        )
        .arg(Arg::with_name("id").short("i").long("id").value_name("NODE_ID").takes_value(true))
        .arg(
            Arg::with_name("listener-ip")
                .short("a")
                .long("listener-ip")
                .value_name("LISTENER_IP")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("peer")
                .short("p")
                .long("peer")
                .value_name("ID@IP")
                .multiple(true)
                .number_of_values(1),
        )
        .get_matches();

    let overrides = Overrides {
        node_id: matches.value_of("id").map(String::from),
        listener_ip: matches.value_of("listener-ip").map(String::from),
        peers: if matches.is_present("peer") {
            values_t!(matches.values_of("peer"), String).unwrap_or_else(|e| e.exit())
        } else {
            vec![]
        },
    };
    let settings = Settings::new(matches.value_of("config"), overrides)?;

    let sys = actix::System::new();
    let result = sys.block_on(async move {
        let node = node::run(settings).await?;

        let sig = if cfg!(unix) {
            use futures::future::FutureExt;
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sigterm = signal(SignalKind::terminate())?;

            futures::select! {
                _ = sigint.recv().fuse() => "SIGINT",
                _ = sigterm.recv().fuse() => "SIGTERM"
            }
        } else {
            tokio::signal::ctrl_c().await?;
            "Ctrl+C"
        };
        info!(target: "zfx-gossip", "Got {}, draining syncs...", sig);

        node.shutdown().await;
        actix::System::current().stop();
        Ok::<(), zfx_gossip::Error>(())
    });
    if let Err(err) = &result {
        error!("node failed: {}", err);
        return result;
    }
    sys.run()?;

    Ok(())
}
