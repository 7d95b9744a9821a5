// Nyseal — Bootstrap sequencer
//
// Drives an ordered manifest through
//   RetryPolicy → [ArtifactSource.read → PayloadCodec.decrypt → ModuleActivator.activate]
//   → ModuleRegistry.register
// and hands back the wired Bridge once every module is active.
//
// The sequencer owns the master secret and the registry. Both go away when
// `run` consumes it; only the frozen registry survives inside the Bridge.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::activation::{Exports, ModuleActivator, ModuleRuntime, ModuleSpec, ScriptRuntime, Symbol};
use crate::bridge::Bridge;
use crate::codec::PayloadCodec;
use crate::enclave::{KeyProvisioner, MasterSecret};

use super::{ArtifactSource, BootstrapError, Manifest, ModuleRegistry, ModuleState, RetryPolicy};

pub struct BootstrapSequencer<S, R = ScriptRuntime> {
    secret: MasterSecret,
    source: S,
    codec: PayloadCodec,
    activator: ModuleActivator<R>,
    retry: RetryPolicy,
    registry: ModuleRegistry,
    states: BTreeMap<String, ModuleState>,
}

impl<S: ArtifactSource> BootstrapSequencer<S, ScriptRuntime> {
    /// Obtains the master secret up front. Provisioning errors are never
    /// retried.
    pub fn new(provisioner: &dyn KeyProvisioner, source: S) -> Result<Self, BootstrapError> {
        let secret = provisioner.obtain()?;
        Ok(Self::with_secret(secret, source))
    }

    pub fn with_secret(secret: MasterSecret, source: S) -> Self {
        Self {
            secret,
            source,
            codec: PayloadCodec::default(),
            activator: ModuleActivator::default(),
            retry: RetryPolicy::default(),
            registry: ModuleRegistry::new(),
            states: BTreeMap::new(),
        }
    }
}

impl<S: ArtifactSource, R: ModuleRuntime> BootstrapSequencer<S, R> {
    pub fn with_codec(mut self, codec: PayloadCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_activator<R2: ModuleRuntime>(
        self,
        activator: ModuleActivator<R2>,
    ) -> BootstrapSequencer<S, R2> {
        BootstrapSequencer {
            secret: self.secret,
            source: self.source,
            codec: self.codec,
            activator,
            retry: self.retry,
            registry: self.registry,
            states: self.states,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Current state of `module`; `None` if it was never requested.
    pub fn state(&self, module: &str) -> Option<ModuleState> {
        self.states.get(module).copied()
    }

    pub fn states(&self) -> impl Iterator<Item = (&str, ModuleState)> {
        self.states.iter().map(|(name, state)| (name.as_str(), *state))
    }

    /// Ad hoc lookup against modules activated so far.
    pub fn get(&self, module: &str, symbol: &str) -> Option<Symbol> {
        self.registry.get(module, symbol)
    }

    /// Loads one module with retries. A module already in the registry is
    /// returned as-is without touching the source or the codec.
    pub fn load(&mut self, spec: &ModuleSpec) -> Result<Arc<Exports>, BootstrapError> {
        if let Some(exports) = self.registry.module(&spec.name) {
            tracing::debug!(module = %spec.name, "Served from registry");
            return Ok(exports);
        }

        tracing::info!(module = %spec.name, kind = ?spec.kind, "Loading module");
        self.states.insert(spec.name.clone(), ModuleState::Pending);

        let Self {
            secret,
            source,
            codec,
            activator,
            retry,
            registry,
            states,
        } = self;

        let activated = retry.run(
            &spec.name,
            |attempt| {
                let payload = source.read(&spec.name)?;
                tracing::debug!(
                    module = %spec.name,
                    attempt,
                    fingerprint = %payload.fingerprint(),
                    "Artifact read"
                );
                let plaintext = codec.decrypt(&payload, secret)?;
                Ok(activator.activate(spec, &plaintext, &*registry)?)
            },
            |state| {
                states.insert(spec.name.clone(), state);
            },
        )?;

        Ok(registry.register(activated.name, activated.exports))
    }

    /// Activates every module in manifest order and returns the wired
    /// aggregate. The first module to exhaust its retries aborts the run.
    pub fn run(mut self, manifest: &Manifest) -> Result<Bridge, BootstrapError> {
        let started = Instant::now();
        for spec in &manifest.modules {
            self.load(spec)?;
        }

        tracing::info!(
            modules = self.registry.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bootstrap complete"
        );

        let Self { registry, .. } = self;
        Ok(Bridge::new(registry.freeze()))
    }
}
