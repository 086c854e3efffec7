use std::fmt::Debug;

use super::Value;

/// The dereference bases of one evaluation, innermost last.
pub struct Frames {
    stack: Vec<Value>,
}

impl Frames {
    pub fn new(root: Value) -> Self {
        Self { stack: vec![root] }
    }

    pub fn current(&self) -> &Value {
        self.stack
            .last()
            .expect("the root frame is never popped")
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push(&mut self, frame: Value) {
        self.stack.push(frame);
    }

    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        } else {
            panic!("Cannot pop the root frame!");
        }
    }
}

impl Debug for Frames {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stack.iter().map(Value::type_name))
            .finish()
    }
}
