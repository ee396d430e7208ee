use crate::choice::ChoiceGenerator;

/// Search-side system state: the stack of choice generators committed to on
/// the current path, oldest first.
#[derive(Debug, Default)]
pub struct SystemState {
    stack: Vec<Box<dyn ChoiceGenerator>>,
}

impl SystemState {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn push(&mut self, cg: Box<dyn ChoiceGenerator>) {
        self.stack.push(cg);
    }

    pub fn pop(&mut self) -> Option<Box<dyn ChoiceGenerator>> {
        self.stack.pop()
    }

    pub fn top(&self) -> Option<&dyn ChoiceGenerator> {
        self.stack.last().map(|cg| cg.as_ref())
    }

    pub fn top_mut(&mut self) -> Option<&mut (dyn ChoiceGenerator + 'static)> {
        self.stack.last_mut().map(|cg| cg.as_mut())
    }

    pub fn get(&self, depth: usize) -> Option<&dyn ChoiceGenerator> {
        self.stack.get(depth).map(|cg| cg.as_ref())
    }

    pub fn get_mut(&mut self, depth: usize) -> Option<&mut (dyn ChoiceGenerator + 'static)> {
        self.stack.get_mut(depth).map(|cg| cg.as_mut())
    }

    /// All generators on the path, root first.
    pub fn choice_generators(&self) -> &[Box<dyn ChoiceGenerator>] {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}
