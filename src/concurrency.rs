use std::io;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs every job on a fresh, detached OS thread. Nothing is pooled, so
/// a long-lived connection never holds up another one; the threads die
/// with the process.
pub struct Spawner {
    name: &'static str,
    spawned: usize,
}

impl Spawner {
    pub fn new(name: &'static str) -> Self {
        Spawner { name, spawned: 0 }
    }

    pub fn execute<F>(&mut self, f: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let job = Box::new(f) as Job;
        let id = self.spawned;
        thread::Builder::new()
            .name(format!("{}-{}", self.name, id))
            .spawn(job)?;
        self.spawned += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier, mpsc};
    use std::time::Duration;

    #[test]
    fn jobs_run_concurrently() {
        let mut spawner = Spawner::new("test");
        let barrier = Arc::new(Barrier::new(4));
        let (tx, rx) = mpsc::channel();

        // every job waits for all the others, so this only finishes if
        // they run at the same time
        for _ in 0..4 {
            let barrier = Arc::clone(&barrier);
            let tx = tx.clone();
            spawner
                .execute(move || {
                    barrier.wait();
                    tx.send(thread::current().name().map(String::from)).unwrap();
                })
                .unwrap();
        }
        drop(tx);

        let mut names: Vec<_> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["test-0", "test-1", "test-2", "test-3"]);
    }

    #[test]
    fn panicking_job_does_not_affect_others() {
        let mut spawner = Spawner::new("test");
        let (tx, rx) = mpsc::channel();

        spawner.execute(|| panic!("boom")).unwrap();
        spawner.execute(move || tx.send(42).unwrap()).unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }
}
