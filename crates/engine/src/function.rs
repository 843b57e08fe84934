//! Request/response handling around [`evaluate`].

use std::time::Duration;

use metrics::counter;
use tracing::{error, info};

use sequencer_core::wire::{Resource, RunFunctionRequest, RunFunctionResponse, DEFAULT_TTL};
use sequencer_core::{Input, Ready, Result, SequencerError};

use crate::evaluate::{evaluate, Evaluation};

/// Function runner configuration.
#[derive(Debug, Clone, Copy)]
pub struct Function {
    pub ttl: Duration,
}

impl Default for Function {
    fn default() -> Self { Self { ttl: DEFAULT_TTL } }
}

impl Function {
    pub fn new(ttl: Duration) -> Self { Self { ttl } }

    /// Run one sequencing pass. Failures become a single fatal result and
    /// leave the request's desired state untouched.
    pub fn run(&self, req: &RunFunctionRequest) -> RunFunctionResponse {
        info!(tag = %req.meta.tag, "running function");
        counter!("sequencer_runs_total", 1u64);
        let mut rsp = RunFunctionResponse::to(req, self.ttl);

        match self.sequence(req) {
            Ok(eval) => apply(&mut rsp, req, eval),
            Err(e) => {
                error!(error = %e, "sequencing failed");
                counter!("sequencer_fatal_total", 1u64);
                rsp.fatal(e.to_string());
            }
        }
        rsp
    }

    fn sequence(&self, req: &RunFunctionRequest) -> Result<Evaluation> {
        let input = match req.input.as_ref() {
            Some(v) => Input::from_value(v)?,
            None => return Err(SequencerError::MissingInput),
        };
        let desired = req.desired.composed();
        let observed = req.observed.composed();
        evaluate(&input.rules, &desired, &observed, input.options())
    }
}

fn apply(rsp: &mut RunFunctionResponse, req: &RunFunctionRequest, eval: Evaluation) {
    for msg in &eval.messages {
        rsp.normal(msg.clone());
    }
    rsp.desired.set_composed(eval.merged());
    if eval.reset_composite {
        let composite = rsp.desired.composite.get_or_insert_with(|| Resource {
            resource: req.observed.composite.as_ref().map(|c| c.resource.clone()).unwrap_or_default(),
            ..Resource::default()
        });
        composite.ready = Ready::False;
    }
}

/// Run with the default TTL.
pub fn run_function(req: &RunFunctionRequest) -> RunFunctionResponse {
    Function::default().run(req)
}
