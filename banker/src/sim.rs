use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::helpe::*;

/// How often the simulation advances by one step.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum Speed {
    /// One step every 2 seconds
    Slow,
    /// One step every second
    #[default]
    Medium,
    /// One step every half second
    Fast,
}

impl Speed {
    pub fn cadence(&self) -> Duration {
        match self {
            Speed::Slow     => Duration::from_millis(2000),
            Speed::Medium   => Duration::from_millis(1000),
            Speed::Fast     => Duration::from_millis(500),
        }
    }
}

/// Everything needed to set up a random [`Simulation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    pub processes:      usize,
    pub resources:      usize,
    /// Upper bound (inclusive) for each maximum-claim cell.
    pub max_claim:      u32,
    /// Upper bound (inclusive) for each initially available cell.
    pub max_available:  u32,
    pub speed:          Speed,
    pub seed:           u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            processes:      5,
            resources:      3,
            max_claim:      7,
            max_available:  5,
            speed:          Speed::Medium,
            seed:           0,
        }
    }
}

/// What happened during one [`Simulation::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    /// The process had nothing left to ask for, so it ran to
    /// completion and gave all its units back.
    Completed { process: usize },
    /// The process asked for more units.
    Requested {
        process:    usize,
        request:    Vec<Units>,
        outcome:    RequestOutcome,
    },
    /// Every process had already completed.
    Idle,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub step:   u64,
    pub event:  StepEvent,
    /// Safety of the state *after* the event. Completed processes are
    /// still part of it, with their full claim as need.
    pub safety: SafetyReport,
    /// Processes the safety check could not admit, minus the ones that
    /// have already completed.
    pub stalled: Vec<usize>,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[step {}] ", self.step)?;
        match &self.event {
            StepEvent::Completed { process } => write!(f, "P{} completed", process)?,
            StepEvent::Requested { process, request, outcome } => write!(
                f,
                "P{} requests [{}]: {}",
                process,
                request.iter().join(", "),
                outcome
            )?,
            StepEvent::Idle => f.write_str("idle")?,
        }
        if self.safety.is_safe {
            write!(f, " | SAFE {}", self.safety)
        } else {
            write!(f, " | UNSAFE, stalled {}", render_order(&self.stalled))
        }
    }
}

/// A time-stepped driver over one [`ResourceState`].
///
/// The driver itself never sleeps: whoever owns it calls
/// [`step`](Simulation::step) at the cadence given by
/// [`speed`](Simulation::speed).
pub struct Simulation {
    state:      ResourceState,
    finished:   Vec<bool>,
    rng:        StdRng,
    step:       u64,
    config:     SimConfig,
}

impl Simulation {
    /// Wraps an existing state. No process starts out finished.
    pub fn new(state: ResourceState, config: SimConfig) -> Self {
        Self {
            finished:   vec![false; state.processes()],
            rng:        StdRng::seed_from_u64(config.seed),
            step:       0,
            state,
            config,
        }
    }

    /// Draws a random but consistent state out of `config.seed`:
    /// claims in `0..=max_claim`, allocations in `0..=claim`,
    /// available units in `0..=max_available`.
    pub fn randomized(config: SimConfig) -> Result<Self, BankerError> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let (p, r) = (config.processes, config.resources);
        let mut state = ResourceState::new(p, r);
        for i in 0..p {
            for j in 0..r {
                let claim = Units::from(rng.gen_range(0..=config.max_claim));
                state.set_maximum(i, j, claim)?;
                state.set_allocation(i, j, rng.gen_range(0..=claim))?;
            }
        }
        for j in 0..r {
            state.set_available(j, Units::from(rng.gen_range(0..=config.max_available)))?;
        }

        let mut res = Self::new(state, config);
        // Keep drawing from where construction stopped.
        res.rng = rng;

        Ok(res)
    }

    pub fn state(&self) -> &ResourceState {
        &self.state
    }

    /// Hands out the state for outside edits (e.g. a user changing a
    /// cell between two steps).
    pub fn state_mut(&mut self) -> &mut ResourceState {
        &mut self.state
    }

    pub fn speed(&self) -> Speed {
        self.config.speed
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.config.speed = speed;
    }

    pub fn steps_taken(&self) -> u64 {
        self.step
    }

    pub fn finished(&self) -> &[bool] {
        &self.finished
    }

    pub fn is_done(&self) -> bool {
        self.finished.iter().all(|&f| f)
    }

    /// Back to an all-zero state of the configured size, step zero.
    pub fn reset(&mut self) {
        self.state.resize(self.config.processes, self.config.resources);
        self.finished = vec![false; self.config.processes];
        self.step = 0;
    }

    /// Advances the simulation by one event and re-checks safety.
    ///
    /// A random unfinished process is picked. If its need is all zero
    /// it completes and releases its units; otherwise it asks for a
    /// random amount within its need, which goes through
    /// [`request_allocation`].
    pub fn step(&mut self) -> Result<StepReport, BankerError> {
        self.step += 1;
        // The state may have been resized from outside.
        if self.finished.len() != self.state.processes() {
            self.finished = vec![false; self.state.processes()];
        }

        let candidates: Vec<usize> = self.finished.iter()
            .positions(|&f| !f)
            .collect();
        let event = match candidates.choose(&mut self.rng) {
            None => StepEvent::Idle,
            Some(&i) => {
                let need = self.state.need_row(i).to_vec();
                if need.iter().all(|&n| n == 0) {
                    self.state.release(i)?;
                    self.finished[i] = true;
                    StepEvent::Completed { process: i }
                } else {
                    let request: Vec<Units> = need.iter()
                        .map(|&n| self.rng.gen_range(0..=n))
                        .collect();
                    let outcome = request_allocation(&mut self.state, i, &request);
                    if let RequestOutcome::Rejected(e) = outcome {
                        return Err(e);
                    }
                    StepEvent::Requested { process: i, request, outcome }
                }
            }
        };
        let safety = check_safety(&self.state);
        let stalled: Vec<usize> = safety.stalled()
            .into_iter()
            .filter(|&i| !self.finished[i])
            .collect();
        info!(step = self.step, safe = safety.is_safe, event = ?event, "simulation step");

        Ok(StepReport {
            step: self.step,
            event,
            safety,
            stalled,
        })
    }
}

/// Tally of a [`survey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyReport {
    pub samples:    usize,
    pub safe:       usize,
}

impl SurveyReport {
    pub fn safe_ratio(&self) -> f64 {
        if self.samples == 0 { 0.0 } else { self.safe as f64 / self.samples as f64 }
    }
}

/// Draws `samples` independent random states and counts the safe ones.
///
/// Sample `k` is seeded with `config.seed + k`, so the tally does not
/// depend on how the work is spread over threads.
pub fn survey(config: &SimConfig, samples: usize) -> Result<SurveyReport, BankerError> {
    let verdicts: Vec<bool> = (0..samples)
        .into_par_iter()
        .map(|k| {
            let cfg = SimConfig {
                seed: config.seed.wrapping_add(k as u64),
                ..config.clone()
            };
            Simulation::randomized(cfg).map(|sim| check_safety(sim.state()).is_safe)
        })
        .collect::<Result<_, _>>()?;
    let safe = verdicts.iter().filter(|&&v| v).count();
    info!(samples, safe, "survey done");

    Ok(SurveyReport {
        samples,
        safe,
    })
}
