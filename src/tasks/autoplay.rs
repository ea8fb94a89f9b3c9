use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::events::{NavCommand, SlideChanged};
use crate::session::Session;

/// Drives a session's carousels until cancelled and hands the session back.
///
/// Each pass runs the autoplay check; when nothing advanced the task yields
/// for `poll` (or less, if a carousel is due sooner) and checks again. Manual
/// navigation arrives on `commands`. Every slide change is reported on
/// `to_viewer`.
#[instrument(skip_all, fields(poll = %humantime::format_duration(poll)))]
pub async fn run(
    mut session: Session,
    poll: Duration,
    mut commands: Receiver<NavCommand>,
    to_viewer: Sender<SlideChanged>,
    cancel: CancellationToken,
) -> Result<Session> {
    let mut commands_open = true;

    loop {
        let advanced = session.render_pass(Instant::now());
        for name in &advanced {
            debug!(carousel = %name, "autoplay advance");
            if !report(&session, name, &to_viewer).await {
                return Ok(session);
            }
        }

        let wait = session
            .until_due(Instant::now())
            .map_or(poll, |due| due.min(poll));

        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; stopping autoplay");
                break;
            }

            maybe_cmd = commands.recv(), if commands_open => {
                match maybe_cmd {
                    Some(cmd) => {
                        let name = cmd.carousel().to_string();
                        if apply(&mut session, cmd) && !report(&session, &name, &to_viewer).await {
                            return Ok(session);
                        }
                    }
                    None => {
                        debug!("command channel closed; autoplay continues");
                        commands_open = false;
                    }
                }
            }

            _ = sleep(wait) => {}
        }
    }

    Ok(session)
}

/// Apply a manual command. Returns `true` if the visible slide changed.
fn apply(session: &mut Session, cmd: NavCommand) -> bool {
    let now = Instant::now();
    let name = cmd.carousel().to_string();
    let controller = match session.carousel_mut(&name) {
        Ok(c) => c,
        Err(err) => {
            warn!(%err, "ignoring navigation command");
            return false;
        }
    };
    let before = controller.current_index();
    match cmd {
        NavCommand::Next { .. } => controller.next(now),
        NavCommand::Prev { .. } => controller.prev(now),
        NavCommand::JumpTo { raw, .. } => controller.jump_to_param(&raw, now),
    }
    controller.current_index() != before
}

/// Send the current slide of `name`. Returns `false` once the viewer is gone.
async fn report(session: &Session, name: &str, to_viewer: &Sender<SlideChanged>) -> bool {
    let Ok(controller) = session.carousel(name) else {
        return true;
    };
    let (Some(index), Some(asset)) = (controller.current_index(), controller.current()) else {
        return true;
    };
    let event = SlideChanged {
        carousel: name.to_string(),
        index,
        path: asset.path.clone(),
        caption: session.caption_for(asset),
    };
    if to_viewer.send(event).await.is_err() {
        warn!("viewer channel closed");
        return false;
    }
    true
}
