use crate::{
    crds::Game,
    reconciler::{self, Context},
};
use futures::{Stream, StreamExt, TryStreamExt};
use kube::{
    runtime::{
        controller::{self, Controller},
        reflector, watcher, WatchStreamExt,
    },
    Api, Client,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

pub mod filter;

use filter::{GameEvent, GameEventFilter};

/// Run the game controller until a shutdown signal is received
pub async fn run(client: Client, ctx: Arc<Context>) {
    let games = Api::<Game>::all(client);
    let (reader, writer) = reflector::store();

    // the store sees every event, the reconciler only the filtered ones
    let mut filter = GameEventFilter::default();
    let triggers = watcher(games, watcher::Config::default())
        .default_backoff()
        .reflect(writer)
        .map_ok(move |event| {
            let passing = filter
                .classify(event)
                .into_iter()
                .filter(GameEvent::should_reconcile)
                .map(|event| Ok::<_, watcher::Error>(event.into_game()));
            futures::stream::iter(passing.collect::<Vec<_>>())
        })
        .try_flatten();

    let resync = resync_ticks(ctx.config.resync_interval());

    info!("Starting controller loop");
    Controller::for_stream(triggers, reader)
        .reconcile_all_on(resync)
        .shutdown_on_signal()
        .run(reconciler::reconcile, reconciler::error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => debug!("Reconciled: {:?}", o),
                // deleted games are no longer in the store
                Err(controller::Error::ObjectNotFound(_)) => {}
                Err(e) => warn!("[!] Reconciliation error: {:?}", e),
            }
        })
        .await;

    info!("Controller stopped");
}

fn resync_ticks(interval: Duration) -> impl Stream<Item = ()> + Send + 'static {
    futures::stream::unfold((), move |()| async move {
        tokio::time::sleep(interval).await;
        Some(((), ()))
    })
}
