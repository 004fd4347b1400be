//! Object-tree opcodes
//!
//! get_sibling and get_child both store their result and then branch on it
//! being nonzero; the store byte is consumed before the branch bytes, in
//! that order.

use crate::error::ZResult;
use crate::interpreter::Interpreter;
use crate::zobject::ObjectTree;

impl Interpreter {
    pub(crate) fn op_get_sibling(&mut self, obj: u16) -> ZResult<()> {
        let sibling = self.vm.object_sibling(obj)?;
        self.store(sibling)?;
        self.branch(sibling != 0)
    }

    pub(crate) fn op_get_child(&mut self, obj: u16) -> ZResult<()> {
        let child = self.vm.object_child(obj)?;
        self.store(child)?;
        self.branch(child != 0)
    }

    pub(crate) fn op_get_parent(&mut self, obj: u16) -> ZResult<()> {
        let parent = self.vm.object_parent(obj)?;
        self.store(parent)
    }

    /// Branch when `obj1`'s parent is `obj2`.
    pub(crate) fn op_jin(&mut self, obj1: u16, obj2: u16) -> ZResult<()> {
        let parent = self.vm.object_parent(obj1)?;
        self.branch(parent == obj2)
    }

    pub(crate) fn op_test_attr(&mut self, obj: u16, attr: u16) -> ZResult<()> {
        let set = self.vm.test_attribute(obj, attr)?;
        self.branch(set)
    }

    pub(crate) fn op_set_attr(&mut self, obj: u16, attr: u16) -> ZResult<()> {
        self.vm.set_attribute(obj, attr, true)
    }

    pub(crate) fn op_clear_attr(&mut self, obj: u16, attr: u16) -> ZResult<()> {
        self.vm.set_attribute(obj, attr, false)
    }

    pub(crate) fn op_remove_obj(&mut self, obj: u16) -> ZResult<()> {
        self.vm.remove_object(obj)
    }

    pub(crate) fn op_insert_obj(&mut self, obj: u16, destination: u16) -> ZResult<()> {
        self.vm.insert_object(obj, destination)
    }

    pub(crate) fn op_get_prop(&mut self, obj: u16, prop: u16) -> ZResult<()> {
        let value = self.vm.get_property(obj, prop)?;
        self.store(value)
    }

    pub(crate) fn op_put_prop(&mut self, obj: u16, prop: u16, value: u16) -> ZResult<()> {
        self.vm.put_property(obj, prop, value)
    }

    pub(crate) fn op_get_prop_addr(&mut self, obj: u16, prop: u16) -> ZResult<()> {
        let addr = self.vm.property_addr(obj, prop)?;
        self.store(addr as u16)
    }

    pub(crate) fn op_get_prop_len(&mut self, data_addr: u16) -> ZResult<()> {
        let len = self.vm.property_length_at(data_addr)?;
        self.store(len)
    }

    pub(crate) fn op_get_next_prop(&mut self, obj: u16, prop: u16) -> ZResult<()> {
        let next = self.vm.next_property(obj, prop)?;
        self.store(next)
    }
}
