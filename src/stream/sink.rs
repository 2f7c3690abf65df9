/// Downstream consumer of a gated stream.
pub trait Sink<T> {
    fn on_next(&mut self, value: T);

    fn on_completed(&mut self);

    fn on_error(&mut self, error: anyhow::Error);

    /// Once true, nothing more is delivered to this sink.
    fn is_unsubscribed(&self) -> bool {
        false
    }
}

impl<T, S: Sink<T> + ?Sized> Sink<T> for &mut S {
    fn on_next(&mut self, value: T) {
        (**self).on_next(value)
    }

    fn on_completed(&mut self) {
        (**self).on_completed()
    }

    fn on_error(&mut self, error: anyhow::Error) {
        (**self).on_error(error)
    }

    fn is_unsubscribed(&self) -> bool {
        (**self).is_unsubscribed()
    }
}

/// Sink that records everything it receives.
#[derive(Debug)]
pub struct CollectSink<T> {
    values: Vec<T>,
    completed: bool,
    error: Option<anyhow::Error>,
    unsubscribed: bool,
}

impl<T> Default for CollectSink<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            completed: false,
            error: None,
            unsubscribed: false,
        }
    }
}

impl<T> CollectSink<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.completed || self.error.is_some()
    }

    pub fn unsubscribe(&mut self) {
        self.unsubscribed = true;
    }
}

impl<T> Sink<T> for CollectSink<T> {
    fn on_next(&mut self, value: T) {
        self.values.push(value);
    }

    fn on_completed(&mut self) {
        self.completed = true;
    }

    fn on_error(&mut self, error: anyhow::Error) {
        self.error = Some(error);
    }

    fn is_unsubscribed(&self) -> bool {
        self.unsubscribed
    }
}
