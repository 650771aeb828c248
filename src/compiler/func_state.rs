// Port of FuncState and related structures from lparser.h
use crate::compiler::expression::ExpDesc;
use crate::compiler::parser::LuaParser;
use crate::gc::ObjectPool;
use crate::lua_value::{Chunk, LuaValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockCntId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LhsAssignId(pub usize);

/// Arena holding the per-function auxiliary structures that, in lparser.c,
/// live on the C call stack as locals (BlockCnt chains, LHS assignment
/// chains). Indexing through ids instead of boxing lets FuncState keep
/// plain mutable access to its own fields while still forming linked lists.
#[derive(Default)]
pub struct CompilerState {
    blockcnts: Vec<BlockCnt>,
    lhs_assigns: Vec<LhsAssign>,
}

impl CompilerState {
    pub fn alloc_blockcnt(&mut self, bl: BlockCnt) -> BlockCntId {
        self.blockcnts.push(bl);
        BlockCntId(self.blockcnts.len() - 1)
    }

    pub fn get_blockcnt_mut(&mut self, id: BlockCntId) -> Option<&mut BlockCnt> {
        self.blockcnts.get_mut(id.0)
    }

    pub fn alloc_lhs_assign(&mut self, lh: LhsAssign) -> LhsAssignId {
        self.lhs_assigns.push(lh);
        LhsAssignId(self.lhs_assigns.len() - 1)
    }

    pub fn get_lhs_assign(&self, id: LhsAssignId) -> Option<&LhsAssign> {
        self.lhs_assigns.get(id.0)
    }

    pub fn get_lhs_assign_mut(&mut self, id: LhsAssignId) -> Option<&mut LhsAssign> {
        self.lhs_assigns.get_mut(id.0)
    }
}

/// Port of FuncState from lparser.h
pub struct FuncState<'a> {
    pub chunk: Chunk,
    pub prev: Option<*mut FuncState<'a>>,
    pub lexer: &'a mut LuaParser<'a>,
    pub pool: &'a mut ObjectPool,
    pub compiler_state: CompilerState,
    pub block_cnt_id: Option<BlockCntId>,
    pub source_name: String,
    pub upvalues: Vec<Upvalue>,
    pub pc: usize,                      // next position to code (equivalent to pc)
    pub last_target: usize,             // label of last 'jump label'
    pub pending_gotos: Vec<LabelDesc>,  // list of pending gotos
    pub labels: Vec<LabelDesc>,         // list of active labels
    pub actvar: Vec<VarDesc>,           // list of active local variables
    pub nactvar: u8,                    // number of active local variables
    pub nups: u8,                       // number of upvalues
    pub freereg: u8,                    // first free register
    pub iwthabs: u8,                    // instructions issued since last absolute line info
    pub needclose: bool,                // true if function needs to close upvalues when returning
    pub is_vararg: bool,                // true if function is vararg
}

/// Port of BlockCnt from lparser.c
#[derive(Default, Clone, Copy)]
pub struct BlockCnt {
    pub previous: Option<BlockCntId>,
    pub first_label: usize, // index of first label in this block
    pub first_goto: usize,  // index of first pending goto in this block
    pub nactvar: u8,        // number of active variables outside the block
    pub upval: bool,        // true if some variable in block is an upvalue
    pub is_loop: u8,        // 0 = not a loop, 1 = loop, 2 = loop pending a 'break' label
    pub in_scope: bool,     // true if the block is inside the scope of a to-be-closed var
}

/// Port of Vardesc from lparser.c - LHS of a multiple assignment (lparser.c's "LHS_assign")
pub struct LhsAssign {
    pub prev: Option<LhsAssignId>,
    pub v: ExpDesc,
}

/// Port of LabelDesc from lparser.c
#[derive(Clone)]
pub struct LabelDesc {
    pub name: String,
    pub pc: usize,
    pub line: usize,
    pub nactvar: u8,
    pub stklevel: u8,
    pub close: bool,
}

/// Port of Upvaldesc from lparser.h - an upvalue as seen by the parser
#[derive(Clone)]
pub struct Upvalue {
    pub name: String,
    pub in_stack: bool, // true if captured from parent's register, false if from parent's upvalue
    pub idx: u16,       // index in parent's register (or upvalue) array
    pub kind: VarKind,
}

/// Port of Vardesc from lparser.c
/// Variable kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    VDKREG = 0,     // regular variable
    RDKCONST = 1,   // constant variable <const>
    RDKTOCLOSE = 2, // to-be-closed variable <close>
    RDKCTC = 3,     // compile-time constant
    GDKREG = 4,     // regular global variable (Lua 5.5 'global' statement)
    GDKCONST = 5,   // <const> global variable
}

pub struct VarDesc {
    pub name: String,
    pub kind: VarKind, // variable kind
    pub ridx: i16,     // register holding the variable
    pub vidx: u16,     // compiler index
    pub const_value: Option<LuaValue>, // value folded at compile time, for RDKCTC
}

impl<'a> FuncState<'a> {
    pub fn new(lexer: &'a mut LuaParser<'a>, pool: &'a mut ObjectPool, is_vararg: bool) -> Self {
        FuncState {
            chunk: Chunk::new(),
            prev: None,
            lexer,
            pool,
            compiler_state: CompilerState::default(),
            block_cnt_id: None,
            source_name: String::new(),
            upvalues: Vec::new(),
            pc: 0,
            last_target: 0,
            pending_gotos: Vec::new(),
            labels: Vec::new(),
            nactvar: 0,
            nups: 0,
            freereg: 0,
            iwthabs: 0,
            needclose: false,
            is_vararg,
            actvar: Vec::new(),
        }
    }

    /// Create a FuncState for a nested function while the enclosing one is
    /// suspended on the parser's call stack. Mirrors lparser.c's `open_func`,
    /// where the new FuncState simply points back at `ls->fs` - here that
    /// aliasing is made explicit via a raw pointer instead of a borrow, since
    /// the parent frame genuinely outlives the child call.
    ///
    /// Safety: caller must ensure `parent` stays alive and is not accessed
    /// again until the returned FuncState (and anything derived from it) is
    /// dropped.
    pub unsafe fn new_child(parent: &mut FuncState<'a>, is_vararg: bool) -> Self {
        let source_name = parent.source_name.clone();
        let parent_ptr: *mut FuncState<'a> = parent;
        let lexer: &'a mut LuaParser<'a> = unsafe { &mut *(parent.lexer as *mut LuaParser<'a>) };
        let pool: &'a mut ObjectPool = unsafe { &mut *(parent.pool as *mut ObjectPool) };
        let mut fs = FuncState::new(lexer, pool, is_vararg);
        fs.prev = Some(parent_ptr);
        fs.source_name = source_name;
        fs
    }

    // Port of new_localvar from lparser.c
    pub fn new_localvar(&mut self, name: String, kind: VarKind) -> u16 {
        let vidx = self.actvar.len() as u16;
        self.actvar.push(VarDesc {
            name,
            kind,
            ridx: self.freereg as i16,
            vidx,
            const_value: None,
        });
        vidx
    }

    // Get variable descriptor
    pub fn get_local_var_desc(&mut self, vidx: u16) -> Option<&mut VarDesc> {
        self.actvar.get_mut(vidx as usize)
    }

    // Port of adjustlocalvars from lparser.c
    pub fn adjust_local_vars(&mut self, nvars: u8) {
        let new_nactvar = self.nactvar + nvars;
        self.freereg = new_nactvar;

        for i in self.nactvar..new_nactvar {
            if let Some(var) = self.actvar.get_mut(i as usize) {
                var.ridx = i as i16;
            }
        }

        self.nactvar = new_nactvar;
    }

    // Port of removevars from lparser.c
    pub fn remove_vars(&mut self, tolevel: u8) {
        while self.nactvar > tolevel {
            self.nactvar -= 1;
            self.freereg -= 1;
        }
    }

    /// Port of luaY_nvarstack from lparser.c: the register level that holds
    /// all currently active variables (RDKCTC variables occupy no register).
    pub fn nvarstack(&self) -> u8 {
        self.reglevel(self.nactvar)
    }

    /// Port of reglevel from lparser.c: register level of the 'nactvar'-th
    /// active variable, skipping over compile-time constants which don't
    /// occupy a register.
    pub fn reglevel(&self, nactvar: u8) -> u8 {
        let mut n = nactvar as isize;
        while n > 0 {
            if let Some(var) = self.actvar.get((n - 1) as usize) {
                if var.kind != VarKind::RDKCTC {
                    return (var.ridx + 1) as u8;
                }
            }
            n -= 1;
        }
        0
    }

    /// Port of searchvar from lparser.c. Returns the ExpKind (as i32) if
    /// found and fills `var`, or -1 if not found among this function's
    /// active local variables.
    pub fn searchvar(&self, name: &str, var: &mut ExpDesc) -> i32 {
        use crate::compiler::expression::ExpKind;

        for i in (0..self.nactvar as usize).rev() {
            if let Some(vd) = self.actvar.get(i) {
                if vd.name == name {
                    return match vd.kind {
                        VarKind::RDKCTC => {
                            *var = ExpDesc::new_const(vd.vidx as usize);
                            ExpKind::VCONST as i32
                        }
                        VarKind::GDKREG | VarKind::GDKCONST => {
                            *var = ExpDesc::new_global(vd.vidx as usize);
                            ExpKind::VGLOBAL as i32
                        }
                        _ => {
                            *var = ExpDesc::new_local(vd.ridx as u8, vd.vidx);
                            ExpKind::VLOCAL as i32
                        }
                    };
                }
            }
        }
        -1
    }

    /// Port of searchupvalue from lparser.c. Returns the index if an
    /// upvalue with this name already exists, or -1.
    pub fn searchupvalue(&self, name: &str) -> i32 {
        for (i, up) in self.upvalues.iter().enumerate() {
            if up.name == name {
                return i as i32;
            }
        }
        -1
    }

    /// Port of newupvalue from lparser.c: register a fresh upvalue that
    /// captures `var` (a VLOCAL or VUPVAL in the enclosing function).
    pub fn newupvalue(&mut self, name: &str, var: &ExpDesc) -> usize {
        use crate::compiler::expression::ExpKind;

        let (in_stack, idx, kind) = match var.kind {
            ExpKind::VLOCAL => {
                let vidx = var.u.var().vidx;
                let kind = self
                    .actvar
                    .get(vidx as usize)
                    .map(|v| v.kind)
                    .unwrap_or(VarKind::VDKREG);
                (true, var.u.var().ridx as u16, kind)
            }
            _ => (false, var.u.info() as u16, VarKind::VDKREG),
        };

        self.upvalues.push(Upvalue {
            name: name.to_string(),
            in_stack,
            idx,
            kind,
        });
        self.nups = self.upvalues.len() as u8;
        self.upvalues.len() - 1
    }

    /// Port of luaK_semerror/luaX_syntaxerror: format an error with the
    /// current source position.
    pub fn syntax_error(&self, msg: &str) -> String {
        format!(
            "{}:{}: {}",
            self.source_name,
            self.lexer.line,
            msg
        )
    }

    /// Same as syntax_error, but quoting the current token in the message
    /// (port of error_expected/token-level errors in lparser.c).
    pub fn token_error(&self, msg: &str) -> String {
        format!(
            "{}:{}: {} near '{}'",
            self.source_name,
            self.lexer.line,
            msg,
            self.lexer.current_token_text()
        )
    }

    /// Mutable access to the block currently being parsed, if any.
    pub fn current_block_cnt(&mut self) -> Option<&mut BlockCnt> {
        match self.block_cnt_id {
            Some(id) => self.compiler_state.get_blockcnt_mut(id),
            None => None,
        }
    }
}
