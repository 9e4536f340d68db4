//! Ordered task queues.

pub(crate) mod ordered;

pub(crate) use ordered::OrderedQueue;
