//! The runtime: owns the document, every component, and the scheduler.

use crate::component::{ComponentId, Slot};
use crate::descriptor::ComponentDescriptor;
use crate::document::Document;
use crate::error::Error;
use crate::host::{Frames, Invalidator, ManualFrames};
use crate::scheduler::{FrameTask, Scheduler};
use core::fmt;
use crossbeam::channel::{self, Receiver, Sender};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// If true, a static attribute or property map that changes its keys between renders is an
    /// error. Otherwise it is diffed like a dynamic map.
    pub check_static_shapes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            check_static_shapes: cfg!(debug_assertions),
        }
    }
}

/// Owns a document and all components rendered into it.
///
/// Everything here is single-threaded; use an [`Invalidator`] to reach the runtime from other
/// threads.
pub struct Runtime<D: Document> {
    pub(crate) document: D,
    pub(crate) slots: HashMap<ComponentId, Slot<D>>,
    pub(crate) scheduler: Scheduler<D>,
    pub(crate) config: Config,
    frames: Box<dyn Frames>,
    invalidation_sender: Sender<ComponentId>,
    invalidation_recv: Receiver<ComponentId>,
}

impl<D: Document> Runtime<D> {
    /// Creates a runtime with the default configuration and manual frames.
    pub fn new(document: D) -> Runtime<D> {
        Runtime::builder(document).build()
    }

    pub fn builder(document: D) -> RuntimeBuilder<D> {
        RuntimeBuilder {
            document,
            config: Config::default(),
            frames: Box::new(ManualFrames),
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler<D> {
        &self.scheduler
    }

    /// Number of live components.
    pub fn component_count(&self) -> usize {
        self.slots.len()
    }

    /// Creates a root component of `descriptor`, appends it to `container`, attaches and
    /// renders it.
    pub fn mount_root<P: 'static, S: Default + 'static>(
        &mut self,
        descriptor: &ComponentDescriptor<D, P, S>,
        props: impl Into<Rc<P>>,
        container: &D::Node,
    ) -> Result<ComponentId, Error<D::Error>> {
        descriptor.mount(self, props, container)
    }

    /// Returns a handle that can invalidate components from anywhere.
    pub fn invalidator(&self) -> Invalidator {
        Invalidator {
            sender: self.invalidation_sender.clone(),
        }
    }

    /// Applies invalidations sent through [`Invalidator`]s. Returns how many were applied.
    ///
    /// Invalidations addressed to components that have since been disposed are dropped.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(id) = self.invalidation_recv.try_recv() {
            if self.contains(id) {
                self.invalidate(id);
                applied += 1;
            } else {
                warn!(component = %id, "dropping invalidation of a disposed component");
            }
        }
        applied
    }

    /// Schedules a task to run at the start of the next flush, before any component updates.
    pub fn before_write(
        &mut self,
        task: impl FnOnce(&mut Runtime<D>) -> Result<(), Error<D::Error>> + 'static,
    ) {
        self.scheduler.push_before_write(Box::new(task) as FrameTask<D>);
        self.request_frame();
    }

    /// Schedules a task to run at the end of the next flush, after all component updates.
    pub fn after_write(
        &mut self,
        task: impl FnOnce(&mut Runtime<D>) -> Result<(), Error<D::Error>> + 'static,
    ) {
        self.scheduler.push_after_write(Box::new(task) as FrameTask<D>);
        self.request_frame();
    }

    /// Requests a frame unless one is pending or a flush is running.
    pub(crate) fn request_frame(&mut self) {
        if self.scheduler.request_frame() {
            trace!("requesting frame");
            self.frames.request_frame();
        }
    }

    /// Runs all pending work: before-write tasks, then queued component updates in depth order,
    /// then after-write tasks, repeating until nothing is left.
    ///
    /// Calling this while a flush is running does nothing; the running flush picks up the new
    /// work. If an update or a task fails, the flush stops; the failed component is queued again
    /// along with everything that hadn’t been updated yet, tasks that hadn’t run stay pending,
    /// and a frame is requested for them.
    pub fn flush(&mut self) -> Result<(), Error<D::Error>> {
        if !self.scheduler.begin_flush() {
            trace!("flush requested while flushing");
            return Ok(());
        }
        let result = self.run_flush();
        self.scheduler.end_flush();
        // a failed flush leaves work behind; it needs a frame of its own
        if self.scheduler.has_work() {
            self.request_frame();
        }
        result
    }

    fn run_flush(&mut self) -> Result<(), Error<D::Error>> {
        let mut updated = 0;
        loop {
            let tasks = self.scheduler.take_before_write();
            if let Err((err, rest)) = self.run_tasks(tasks) {
                self.scheduler.restore_before_write(rest);
                return Err(err);
            }

            while let Some(id) = self.scheduler.pop() {
                if !self.contains(id) {
                    continue;
                }
                if let Err(err) = self.update(id) {
                    if self.contains(id) {
                        let depth = self.depth(id);
                        self.scheduler.enqueue(id, depth);
                    }
                    return Err(err);
                }
                updated += 1;
            }

            let tasks = self.scheduler.take_after_write();
            if let Err((err, rest)) = self.run_tasks(tasks) {
                self.scheduler.restore_after_write(rest);
                return Err(err);
            }

            if !self.scheduler.has_work() {
                break;
            }
        }
        debug!(updated, "flushed");
        Ok(())
    }

    /// Runs tasks in order. On failure, returns the error with the tasks that didn’t run.
    fn run_tasks(
        &mut self,
        tasks: Vec<FrameTask<D>>,
    ) -> Result<(), (Error<D::Error>, Vec<FrameTask<D>>)> {
        let mut tasks = tasks.into_iter();
        while let Some(task) = tasks.next() {
            if let Err(err) = task(self) {
                return Err((err, tasks.collect()));
            }
        }
        Ok(())
    }

    /// Clears all queues, tasks and flags. Components are left as they are.
    pub fn reset_scheduler(&mut self) {
        self.scheduler.reset();
    }
}

impl<D: Document + fmt::Debug> fmt::Debug for Runtime<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("document", &self.document)
            .field("components", &self.slots)
            .field("scheduler", &self.scheduler)
            .field("config", &self.config)
            .finish()
    }
}

/// Configures a [`Runtime`].
pub struct RuntimeBuilder<D: Document> {
    document: D,
    config: Config,
    frames: Box<dyn Frames>,
}

impl<D: Document> RuntimeBuilder<D> {
    /// Sets the frame requester (default: [`ManualFrames`]).
    pub fn frames(mut self, frames: impl Frames + 'static) -> Self {
        self.frames = Box::new(frames);
        self
    }

    /// See [`Config::check_static_shapes`].
    pub fn check_static_shapes(mut self, check: bool) -> Self {
        self.config.check_static_shapes = check;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Runtime<D> {
        let (invalidation_sender, invalidation_recv) = channel::unbounded();
        Runtime {
            document: self.document,
            slots: HashMap::new(),
            scheduler: Scheduler::new(),
            config: self.config,
            frames: self.frames,
            invalidation_sender,
            invalidation_recv,
        }
    }
}
