use crate::error::GateError;
use crate::service::bootstrap::{
    Activation, ActivationKey, ActivationOutcome, ActivationRequest, HookOptions,
};
use crate::types::hook::HookState;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

/// Messages handled by the session hook actor.
#[derive(Debug)]
pub enum SessionHookMessage {
    /// Start an activation unless the identifying inputs are unchanged.
    /// Replies with the generation that will carry the result.
    Activate(ActivationRequest, RpcReplyPort<u64>),

    // Internal messages (sent by the actor's own tasks)
    /// An activation task finished.
    Completed {
        generation: u64,
        outcome: ActivationOutcome,
    },
}

/// Handle for driving a session hook and observing its state.
#[derive(Clone)]
pub struct SessionHookHandle {
    actor: ActorRef<SessionHookMessage>,
    state_rx: watch::Receiver<HookState>,
}

impl SessionHookHandle {
    /// Activate the hook with new inputs. Returns the activation's generation.
    pub async fn activate(&self, request: ActivationRequest) -> Result<u64, GateError> {
        ractor::call!(self.actor, SessionHookMessage::Activate, request)
            .map_err(|e| GateError::RactorError(format!("Activate RPC failed: {e}")))
    }

    /// Current state.
    pub fn state(&self) -> HookState {
        self.state_rx.borrow().clone()
    }

    /// Stream of states, starting with the current one.
    pub fn subscribe(&self) -> WatchStream<HookState> {
        WatchStream::new(self.state_rx.clone())
    }

    /// Wait until `generation` (or a newer activation) has settled.
    pub async fn settled(&self, generation: u64) -> Result<HookState, GateError> {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|s| s.is_settled_for(generation))
            .await
            .map_err(|_| GateError::RactorError("session hook stopped".to_string()))?;
        Ok((*state).clone())
    }

    pub fn shutdown(&self) {
        self.actor.stop(None);
    }
}

/// Internal state held by the session hook actor.
struct SessionHookState {
    options: HookOptions,
    state_tx: watch::Sender<HookState>,
    generation: u64,
    current: Option<ActivationKey>,
}

struct SessionHookActor;

#[ractor::async_trait]
impl Actor for SessionHookActor {
    type Msg = SessionHookMessage;
    type State = SessionHookState;
    type Arguments = (HookOptions, watch::Sender<HookState>);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        arguments: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let (options, state_tx) = arguments;
        Ok(SessionHookState {
            options,
            state_tx,
            generation: 0,
            current: None,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SessionHookMessage::Activate(request, reply) => {
                let generation = self.handle_activate(state, &myself, request);
                let _ = reply.send(generation);
            }
            SessionHookMessage::Completed {
                generation,
                outcome,
            } => {
                if generation != state.generation {
                    debug!(
                        generation,
                        current = state.generation,
                        "discarding superseded activation result"
                    );
                    return Ok(());
                }
                state.state_tx.send_replace(outcome.into_state(generation));
            }
        }
        Ok(())
    }
}

impl SessionHookActor {
    fn handle_activate(
        &self,
        state: &mut SessionHookState,
        myself: &ActorRef<SessionHookMessage>,
        request: ActivationRequest,
    ) -> u64 {
        let key = request.key();
        if state.current.as_ref() == Some(&key) {
            debug!(generation = state.generation, "inputs unchanged; activation skipped");
            return state.generation;
        }

        state.generation += 1;
        state.current = Some(key);
        let generation = state.generation;
        state.state_tx.send_replace(HookState::loading(generation));
        info!(generation, app_id = %request.app_id, "activation started");

        let activation = Activation::new(request, &state.options);
        let me = myself.clone();
        tokio::spawn(async move {
            let outcome = activation.run().await;
            let _ = ractor::cast!(
                me,
                SessionHookMessage::Completed {
                    generation,
                    outcome
                }
            );
        });
        generation
    }
}

/// Spawn a session hook and return its handle.
pub async fn spawn(options: HookOptions) -> Result<SessionHookHandle, GateError> {
    let (state_tx, state_rx) = watch::channel(HookState::default());
    let (actor, _jh) = Actor::spawn(None, SessionHookActor, (options, state_tx))
        .await
        .map_err(|e| GateError::RactorError(format!("failed to spawn session hook: {e}")))?;
    Ok(SessionHookHandle { actor, state_rx })
}
