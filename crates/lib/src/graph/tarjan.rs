//! Tarjan's strongly connected components, without recursion.
//!
//! Vertices are plain indices and `adjacency[v]` lists the vertices `v`
//! depends on. Traversal follows the order of `adjacency` and of the vertex
//! indices, so the output is fully determined by the input.

#[derive(Debug, Clone, Copy, Default)]
struct VertexState {
  index: Option<usize>,
  lowlink: usize,
  on_stack: bool,
}

struct Tarjan {
  state: Vec<VertexState>,
  next_index: usize,
  stack: Vec<usize>,
}

impl Tarjan {
  fn discover(&mut self, v: usize) {
    self.state[v] = VertexState {
      index: Some(self.next_index),
      lowlink: self.next_index,
      on_stack: true,
    };
    self.next_index += 1;
    self.stack.push(v);
  }
}

/// Compute the strongly connected components of the graph.
///
/// Components are returned in completion order: every component appears after
/// all components it has edges into, so with edges pointing from dependent to
/// dependency this is a valid build order. Members of a component are listed
/// in stack-pop order.
pub(crate) fn strong_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
  let mut tarjan = Tarjan {
    state: vec![VertexState::default(); adjacency.len()],
    next_index: 0,
    stack: Vec::new(),
  };
  let mut components = Vec::new();

  // Simulated call stack: (vertex, position of the next edge to follow).
  let mut frames: Vec<(usize, usize)> = Vec::new();

  for root in 0..adjacency.len() {
    if tarjan.state[root].index.is_some() {
      continue;
    }

    tarjan.discover(root);
    frames.push((root, 0));

    while let Some(frame) = frames.last_mut() {
      let (v, edge) = *frame;

      if let Some(&w) = adjacency[v].get(edge) {
        frame.1 += 1;
        match tarjan.state[w].index {
          None => {
            tarjan.discover(w);
            frames.push((w, 0));
          }
          Some(w_index) if tarjan.state[w].on_stack => {
            tarjan.state[v].lowlink = tarjan.state[v].lowlink.min(w_index);
          }
          Some(_) => {}
        }
        continue;
      }

      // All edges of v are done: return to the caller frame.
      frames.pop();
      if let Some(&(parent, _)) = frames.last() {
        let child_low = tarjan.state[v].lowlink;
        tarjan.state[parent].lowlink = tarjan.state[parent].lowlink.min(child_low);
      }

      if tarjan.state[v].index == Some(tarjan.state[v].lowlink) {
        let mut component = Vec::new();
        while let Some(w) = tarjan.stack.pop() {
          tarjan.state[w].on_stack = false;
          component.push(w);
          if w == v {
            break;
          }
        }
        components.push(component);
      }
    }
  }

  components
}
