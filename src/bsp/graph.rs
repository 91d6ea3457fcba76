// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The graph store and superstep engine (spec §4.C, §4.D).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, RwLock, Weak};

use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinSet;

use crate::observability::messages::bsp::VertexComputeFailed;
use crate::observability::messages::StructuredLog;

use super::aggregator::Aggregator;
use super::error::{ConfigError, GraphError};
use super::message::{Message, MessageIterator, Queue, QueueFactory};

/// A user-supplied vertex-local computation, invoked once per active vertex
/// per superstep.
pub type ComputeFn<V, E> = Arc<
    dyn Fn(&Graph<V, E>, &Vertex<V, E>, &mut dyn MessageIterator) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync,
>;

/// Forwards a message to a vertex managed by a remote graph partition.
/// Implementations must return [`GraphError::DestinationIsLocal`] to
/// decline a destination they don't own, letting `send_message` fall
/// through to its own "no such destination" error.
pub trait Relayer: Send + Sync {
    fn relay(&self, dst_id: &str, msg: &dyn Message) -> Result<(), GraphError>;
}

/// A directed edge, owned by its source vertex. The destination may name a
/// vertex that lives outside this graph instance.
pub struct Edge<E> {
    dst_id: String,
    value: E,
}

impl<E> Edge<E> {
    pub fn new(dst_id: impl Into<String>, value: E) -> Self {
        Self {
            dst_id: dst_id.into(),
            value,
        }
    }

    pub fn dst_id(&self) -> &str {
        &self.dst_id
    }

    pub fn value(&self) -> &E {
        &self.value
    }

    pub fn set_value(&mut self, value: E) {
        self.value = value;
    }
}

/// A graph vertex: opaque value, activity flag, double-buffered inbox, and
/// its outgoing edges. Owned by the [`Graph`] that created it; referenced
/// everywhere else by id.
pub struct Vertex<V, E> {
    id: String,
    value: StdMutex<V>,
    active: AtomicBool,
    inbox: [Box<dyn Queue>; 2],
    edges: StdMutex<Vec<Edge<E>>>,
}

impl<V, E> Vertex<V, E> {
    fn new(id: String, value: V, inbox: [Box<dyn Queue>; 2]) -> Self {
        Self {
            id,
            value: StdMutex::new(value),
            active: AtomicBool::new(true),
            inbox,
            edges: StdMutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> MutexGuard<'_, V> {
        self.value.lock().unwrap()
    }

    pub fn set_value(&self, value: V) {
        *self.value.lock().unwrap() = value;
    }

    pub fn active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Marks the vertex inactive. Frozen vertices are skipped in future
    /// supersteps unless a message re-activates them.
    pub fn freeze(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn edges(&self) -> MutexGuard<'_, Vec<Edge<E>>> {
        self.edges.lock().unwrap()
    }

    fn add_edge(&self, edge: Edge<E>) {
        self.edges.lock().unwrap().push(edge);
    }

    fn inbox(&self, buffer: usize) -> &dyn Queue {
        self.inbox[buffer].as_ref()
    }

    fn close_queues(&self) -> Result<(), GraphError> {
        for queue in &self.inbox {
            queue.close()?;
        }
        Ok(())
    }
}

/// Construction parameters for a [`Graph`]. All three fields are required;
/// [`GraphConfig::validate`] reports which is missing or invalid.
pub struct GraphConfig<V, E> {
    pub compute_fn: Option<ComputeFn<V, E>>,
    pub queue_factory: Option<QueueFactory>,
    pub compute_workers: i64,
}

impl<V, E> GraphConfig<V, E> {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compute_fn.is_none() {
            return Err(ConfigError::MissingComputeFn);
        }
        if self.queue_factory.is_none() {
            return Err(ConfigError::MissingQueueFactory);
        }
        if self.compute_workers <= 0 {
            return Err(ConfigError::NonPositiveWorkerCount(self.compute_workers));
        }
        Ok(())
    }
}

/// A parallel graph processor implementing the Pregel bulk-synchronous
/// execution model: supersteps of vertex-local computation separated by a
/// barrier, with message delivery deferred to the following step.
pub struct Graph<V, E> {
    superstep: AtomicI64,
    aggregators: RwLock<HashMap<String, Arc<dyn Aggregator>>>,
    vertices: RwLock<HashMap<String, Arc<Vertex<V, E>>>>,
    compute_fn: ComputeFn<V, E>,
    queue_factory: QueueFactory,
    relayer: RwLock<Option<Arc<dyn Relayer>>>,
    workers: AsyncMutex<JoinSet<()>>,
    vertex_tx: AsyncMutex<Option<mpsc::Sender<Arc<Vertex<V, E>>>>>,
    step_completed_rx: AsyncMutex<mpsc::Receiver<()>>,
    error_rx: AsyncMutex<mpsc::Receiver<GraphError>>,
    active_in_step: AtomicI64,
    pending_in_step: AtomicI64,
}

impl<V, E> Graph<V, E>
where
    V: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Validates `cfg`, then spins up `cfg.compute_workers` long-lived
    /// worker tasks that remain parked on the vertex-dispatch channel until
    /// [`Graph::close`] drops it.
    pub fn new(cfg: GraphConfig<V, E>) -> Result<Arc<Self>, ConfigError> {
        cfg.validate()?;
        let compute_fn = cfg.compute_fn.unwrap();
        let queue_factory = cfg.queue_factory.unwrap();
        let worker_count = cfg.compute_workers as usize;

        let (vertex_tx, vertex_rx) = mpsc::channel::<Arc<Vertex<V, E>>>(1);
        let (step_completed_tx, step_completed_rx) = mpsc::channel::<()>(1);
        let (error_tx, error_rx) = mpsc::channel::<GraphError>(1);
        let vertex_rx = Arc::new(AsyncMutex::new(vertex_rx));

        let graph = Arc::new_cyclic(|weak: &Weak<Graph<V, E>>| {
            let mut workers = JoinSet::new();
            for _ in 0..worker_count {
                let weak = weak.clone();
                let vertex_rx = Arc::clone(&vertex_rx);
                let step_completed_tx = step_completed_tx.clone();
                let error_tx = error_tx.clone();
                workers.spawn(async move {
                    run_worker(weak, vertex_rx, step_completed_tx, error_tx).await;
                });
            }
            Graph {
                superstep: AtomicI64::new(0),
                aggregators: RwLock::new(HashMap::new()),
                vertices: RwLock::new(HashMap::new()),
                compute_fn,
                queue_factory,
                relayer: RwLock::new(None),
                workers: AsyncMutex::new(workers),
                vertex_tx: AsyncMutex::new(Some(vertex_tx)),
                step_completed_rx: AsyncMutex::new(step_completed_rx),
                error_rx: AsyncMutex::new(error_rx),
                active_in_step: AtomicI64::new(0),
                pending_in_step: AtomicI64::new(0),
            }
        });
        Ok(graph)
    }

    pub fn superstep(&self) -> i64 {
        self.superstep.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_superstep_counter(&self) {
        self.superstep.store(0, Ordering::SeqCst);
    }

    pub(crate) fn advance_superstep(&self) {
        self.superstep.fetch_add(1, Ordering::SeqCst);
    }

    /// Inserts a new vertex, or overwrites the `value` field of an existing
    /// one — its message queues and activity flag are preserved on re-add.
    pub fn add_vertex(&self, id: impl Into<String>, value: V) {
        let id = id.into();
        let mut vertices = self.vertices.write().unwrap();
        match vertices.get(&id) {
            Some(existing) => existing.set_value(value),
            None => {
                let inbox = [(self.queue_factory)(), (self.queue_factory)()];
                vertices.insert(id.clone(), Arc::new(Vertex::new(id, value, inbox)));
            }
        }
    }

    /// Looks up a vertex by id (spec §4.C "id→vertex lookup").
    pub fn vertex(&self, id: &str) -> Option<Arc<Vertex<V, E>>> {
        self.vertices.read().unwrap().get(id).cloned()
    }

    /// Every vertex currently in the graph store.
    pub fn vertices(&self) -> Vec<Arc<Vertex<V, E>>> {
        self.vertices.read().unwrap().values().cloned().collect()
    }

    /// Appends a directed edge from `src_id` to `dst_id`. `src_id` must name
    /// a local vertex; `dst_id` is not validated — the destination may live
    /// on a remote partition reached only through a [`Relayer`].
    pub fn add_edge(&self, src_id: &str, dst_id: &str, value: E) -> Result<(), GraphError> {
        let vertices = self.vertices.read().unwrap();
        let src = vertices.get(src_id).ok_or_else(|| GraphError::UnknownEdgeSource {
            src_id: src_id.to_string(),
        })?;
        src.add_edge(Edge::new(dst_id, value));
        Ok(())
    }

    pub fn register_aggregator(&self, name: impl Into<String>, aggregator: Arc<dyn Aggregator>) {
        self.aggregators.write().unwrap().insert(name.into(), aggregator);
    }

    pub fn aggregator(&self, name: &str) -> Option<Arc<dyn Aggregator>> {
        self.aggregators.read().unwrap().get(name).cloned()
    }

    pub fn register_relayer(&self, relayer: Arc<dyn Relayer>) {
        *self.relayer.write().unwrap() = Some(relayer);
    }

    /// Enqueues `msg` for delivery at the start of the next superstep. Local
    /// destinations are enqueued directly; otherwise a registered relayer
    /// is given the chance to forward it, declining with
    /// [`GraphError::DestinationIsLocal`] if it doesn't recognize `dst_id`.
    pub fn send_message(&self, dst_id: &str, msg: Box<dyn Message>) -> Result<(), GraphError> {
        let next_buffer = ((self.superstep() + 1) % 2) as usize;
        {
            let vertices = self.vertices.read().unwrap();
            if let Some(dst) = vertices.get(dst_id) {
                return dst.inbox(next_buffer).enqueue(msg);
            }
        }
        let relayer = self.relayer.read().unwrap().clone();
        if let Some(relayer) = relayer {
            match relayer.relay(dst_id, msg.as_ref()) {
                Ok(()) => return Ok(()),
                Err(GraphError::DestinationIsLocal) => {}
                Err(err) => return Err(err),
            }
        }
        Err(GraphError::InvalidMessageDestination {
            dst_id: dst_id.to_string(),
        })
    }

    /// Sends an independent copy of `msg` to every neighbor reachable from
    /// `v`'s outgoing edges.
    pub fn broadcast_to_neighbors(&self, v: &Vertex<V, E>, msg: &dyn Message) -> Result<(), GraphError> {
        for edge in v.edges().iter() {
            self.send_message(edge.dst_id(), msg.clone_message())?;
        }
        Ok(())
    }

    /// Runs one superstep: dispatches every vertex to the worker pool,
    /// awaits the barrier, and drains at most one error. Returns the number
    /// of vertices processed and, if a worker reported a failure, that
    /// failure — both are always returned together.
    pub async fn step(&self) -> (i64, Option<GraphError>) {
        let vertices: Vec<Arc<Vertex<V, E>>> = self.vertices.read().unwrap().values().cloned().collect();
        let total = vertices.len() as i64;
        if total == 0 {
            return (0, None);
        }

        self.active_in_step.store(0, Ordering::SeqCst);
        self.pending_in_step.store(total, Ordering::SeqCst);

        let sender = {
            let guard = self.vertex_tx.lock().await;
            match guard.as_ref() {
                Some(tx) => tx.clone(),
                None => return (0, Some(GraphError::AlreadyClosed)),
            }
        };
        for vertex in vertices {
            if sender.send(vertex).await.is_err() {
                break;
            }
        }

        self.step_completed_rx.lock().await.recv().await;

        let error = self.error_rx.lock().await.try_recv().ok();
        (self.active_in_step.load(Ordering::SeqCst), error)
    }

    /// Removes every vertex and aggregator and resets the superstep
    /// counter. Safe to call after [`Graph::close`]; a no-op beyond queue
    /// closure in that case since the vertex map is already empty.
    pub fn reset(&self) -> Result<(), GraphError> {
        self.superstep.store(0, Ordering::SeqCst);
        let mut vertices = self.vertices.write().unwrap();
        for vertex in vertices.values() {
            vertex.close_queues()?;
        }
        vertices.clear();
        self.aggregators.write().unwrap().clear();
        Ok(())
    }

    /// Closes the vertex-dispatch channel, joins every worker, then calls
    /// [`Graph::reset`]. Calling `close` a second time returns
    /// [`GraphError::AlreadyClosed`].
    pub async fn close(&self) -> Result<(), GraphError> {
        let sender = self.vertex_tx.lock().await.take();
        if sender.is_none() {
            return Err(GraphError::AlreadyClosed);
        }
        drop(sender);

        let mut workers = self.workers.lock().await;
        while workers.join_next().await.is_some() {}
        drop(workers);

        self.reset()
    }
}

async fn run_worker<V, E>(
    graph: Weak<Graph<V, E>>,
    vertex_rx: Arc<AsyncMutex<mpsc::Receiver<Arc<Vertex<V, E>>>>>,
    step_completed_tx: mpsc::Sender<()>,
    error_tx: mpsc::Sender<GraphError>,
) where
    V: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    let Some(graph) = graph.upgrade() else { return };
    loop {
        let vertex = {
            let mut rx = vertex_rx.lock().await;
            rx.recv().await
        };
        let Some(vertex) = vertex else { break };

        let superstep = graph.superstep();
        let buffer = (superstep % 2) as usize;
        if vertex.active() || vertex.inbox(buffer).pending_messages() {
            graph.active_in_step.fetch_add(1, Ordering::SeqCst);
            vertex.active.store(true, Ordering::SeqCst);
            let mut iter = vertex.inbox(buffer).messages();
            match (graph.compute_fn)(&graph, &vertex, &mut *iter) {
                Ok(()) => {
                    if let Err(source) = vertex.inbox(buffer).discard_messages() {
                        let wrapped = GraphError::QueueDiscard {
                            vertex_id: vertex.id().to_string(),
                            source: Box::new(source),
                        };
                        VertexComputeFailed {
                            vertex_id: vertex.id(),
                            superstep: superstep as usize,
                            error: &wrapped,
                        }
                        .log();
                        let _ = error_tx.try_send(wrapped);
                    }
                }
                Err(source) => {
                    VertexComputeFailed {
                        vertex_id: vertex.id(),
                        superstep: superstep as usize,
                        error: source.as_ref(),
                    }
                    .log();
                    let wrapped = GraphError::Compute {
                        vertex_id: vertex.id().to_string(),
                        source,
                    };
                    let _ = error_tx.try_send(wrapped);
                }
            }
        }

        if graph.pending_in_step.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = step_completed_tx.send(()).await;
        }
    }
}
