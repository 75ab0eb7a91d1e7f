//! Asynchronous waveform generation.
//!
//! Generation (on the order of 10 ms per phrase) never runs on the render
//! thread. Jobs go to a small pool of worker threads; finished waveforms come
//! back through a channel the render thread drains at the start of each frame
//! with `try_recv`, so it never blocks on a worker.

use super::{PhraseId, WaveformData};
use crate::monitor::{MetricsSink, NoopMetrics};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

/// Producer of waveform data for a phrase source reference.
///
/// Implementations either return a complete waveform or nothing; there is no
/// partial result.
pub trait WaveformGenerator: Send + Sync {
    fn generate(&self, source: &str) -> Option<WaveformData>;
}

impl<F> WaveformGenerator for F
where
    F: Fn(&str) -> Option<WaveformData> + Send + Sync,
{
    fn generate(&self, source: &str) -> Option<WaveformData> {
        self(source)
    }
}

/// A request to produce the waveform for `phrase`.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub phrase: PhraseId,
    pub source: String,
}

/// A finished generation. `waveform` is `None` when the generator produced nothing.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub phrase: PhraseId,
    pub waveform: Option<Arc<WaveformData>>,
}

/// Fixed-size pool of generation threads with a non-blocking result handoff.
pub struct GenerationWorker {
    jobs: Option<Sender<GenerationJob>>,
    results: Receiver<GenerationResult>,
    threads: Vec<JoinHandle<()>>,
}

impl GenerationWorker {
    /// Spawn `threads` workers (minimum 1) running `generator`.
    pub fn spawn(
        generator: Arc<dyn WaveformGenerator>,
        threads: usize,
        metrics: Option<Arc<dyn MetricsSink>>,
    ) -> std::io::Result<Self> {
        let metrics: Arc<dyn MetricsSink> = metrics.unwrap_or_else(|| Arc::new(NoopMetrics));
        let (job_tx, job_rx) = mpsc::channel::<GenerationJob>();
        let (result_tx, result_rx) = mpsc::channel::<GenerationResult>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let mut handles = Vec::with_capacity(threads.max(1));
        for index in 0..threads.max(1) {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let generator = generator.clone();
            let metrics = metrics.clone();

            let handle = std::thread::Builder::new()
                .name(format!("waveform-gen-{index}"))
                .spawn(move || loop {
                    // Hold the lock only while waiting for the next job
                    let job = {
                        let rx = job_rx.lock().unwrap_or_else(PoisonError::into_inner);
                        rx.recv()
                    };
                    let Ok(job) = job else {
                        break;
                    };

                    let start = Instant::now();
                    let waveform = generator.generate(&job.source);
                    metrics.record_generation(start.elapsed());

                    let waveform = waveform.map(Arc::new);
                    if waveform.is_none() {
                        log::warn!("Waveform generation produced nothing for {}", job.phrase);
                    }
                    let result = GenerationResult {
                        phrase: job.phrase,
                        waveform,
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                })?;
            handles.push(handle);
        }

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            threads: handles,
        })
    }

    /// Queue a job. Returns false if the pool has shut down.
    pub fn submit(&self, job: GenerationJob) -> bool {
        match &self.jobs {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        }
    }

    /// Take every finished result without blocking.
    pub fn drain(&self) -> Vec<GenerationResult> {
        let mut out = Vec::new();
        loop {
            match self.results.try_recv() {
                Ok(result) => out.push(result),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }
}

impl Drop for GenerationWorker {
    fn drop(&mut self) {
        // Closing the job channel ends each worker loop
        self.jobs.take();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for GenerationWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationWorker")
            .field("threads", &self.threads.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::PerformanceMonitor;
    use crate::waveform::SyntheticGenerator;
    use std::time::Duration;

    fn wait_for(worker: &GenerationWorker, count: usize) -> Vec<GenerationResult> {
        let mut results = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while results.len() < count && Instant::now() < deadline {
            results.extend(worker.drain());
            std::thread::sleep(Duration::from_millis(1));
        }
        results
    }

    #[test]
    fn test_worker_generates_and_hands_off() {
        let monitor = Arc::new(PerformanceMonitor::new(120));
        let worker = GenerationWorker::spawn(
            Arc::new(SyntheticGenerator::new(64)),
            2,
            Some(monitor.clone()),
        )
        .unwrap();
        assert_eq!(worker.thread_count(), 2);

        for name in ["a", "b", "c"] {
            assert!(worker.submit(GenerationJob {
                phrase: PhraseId::new(name),
                source: name.to_string(),
            }));
        }

        let results = wait_for(&worker, 3);
        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .all(|r| r.waveform.as_ref().is_some_and(|w| w.point_count() == 64)));
        assert_eq!(monitor.snapshot().generation_count, 3);
    }

    #[test]
    fn test_drain_never_blocks() {
        let slow = |_: &str| -> Option<WaveformData> {
            std::thread::sleep(Duration::from_millis(200));
            None
        };
        let worker = GenerationWorker::spawn(Arc::new(slow), 1, None).unwrap();
        worker.submit(GenerationJob {
            phrase: PhraseId::new("slow"),
            source: "slow".into(),
        });

        let start = Instant::now();
        assert!(worker.drain().is_empty());
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_empty_generation_is_reported() {
        let nothing = |_: &str| -> Option<WaveformData> { None };
        let worker = GenerationWorker::spawn(Arc::new(nothing), 1, None).unwrap();
        worker.submit(GenerationJob {
            phrase: PhraseId::new("x"),
            source: "x".into(),
        });
        let results = wait_for(&worker, 1);
        assert_eq!(results.len(), 1);
        assert!(results[0].waveform.is_none());
    }
}
